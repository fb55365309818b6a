//! The render system.
//!
//! Holds `(render, space)` pairs in draw order and records one frame per
//! update. Order is z-index ascending, then shader id ascending, so entities
//! sharing a shader end up next to each other and the number of program
//! switches equals the number of shader runs.
//!
//! Sorting is lazy: adding or removing entities and the components'
//! [`set_z_index`](RenderComponent::set_z_index) and
//! [`set_shader`](RenderComponent::set_shader) setters mark the order dirty,
//! and the next update sorts once.

use std::cell::Cell;
use std::rc::Rc;

use tessera_ecs::component::{ComponentBag, Shared};
use tessera_ecs::entity::EntityId;
use tessera_ecs::message::{MessageBus, Message};
use tessera_ecs::system::System;
use tessera_ecs::table::EntityTable;

use crate::context::EngineContext;
use crate::engine::WindowResizeMessage;
use crate::geometry::SpaceComponent;

use super::component::RenderComponent;
use super::frame::{CameraView, RenderCommand, Viewport};
use super::shader::{ShaderHandle, ShaderId};

/// Runs after every other system so the frame sees final positions.
pub const RENDER_PRIORITY: i32 = -1000;

/// Dispatched when a tracked component's z-index or shader changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOrderChanged;

impl RenderOrderChanged {
    pub const KIND: &'static str = "RenderOrderChanged";
}

impl Message for RenderOrderChanged {
    fn kind(&self) -> &str {
        Self::KIND
    }
}

/// What the render system tracks per entity.
#[derive(Debug, Clone)]
pub struct RenderEntity {
    pub render: Shared<RenderComponent>,
    pub space: Shared<SpaceComponent>,
}

// ---------------------------------------------------------------------------
// RenderSystem
// ---------------------------------------------------------------------------

/// Sorts and draws every entity with a render and a space component.
#[derive(Debug, Default)]
pub struct RenderSystem {
    entities: EntityTable<RenderEntity>,
    dirty: Rc<Cell<bool>>,
    bus: Option<Rc<MessageBus>>,
    default_shader: Option<ShaderId>,
}

impl RenderSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `entity`. A second add of the same entity is ignored.
    pub fn add(
        &mut self,
        entity: EntityId,
        render: Shared<RenderComponent>,
        space: Shared<SpaceComponent>,
    ) -> bool {
        let notifier = self.order_notifier();
        let tracked = RenderEntity {
            render: render.clone(),
            space,
        };
        if let Err(e) = self.entities.insert(entity, tracked) {
            tracing::warn!(%entity, error = %e, "render entity not added");
            return false;
        }
        render.borrow_mut().set_order_notifier(notifier);
        self.dirty.set(true);
        true
    }

    /// Dispatches [`RenderOrderChanged`] on the attached bus, if any.
    fn order_notifier(&self) -> Option<Rc<dyn Fn()>> {
        self.bus.clone().map(|bus| {
            Rc::new(move || bus.dispatch(&RenderOrderChanged)) as Rc<dyn Fn()>
        })
    }

    /// Entities in their current draw order.
    pub fn draw_order(&self) -> Vec<EntityId> {
        self.entities.ids()
    }

    /// Whether a sort is pending.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn sort(&mut self) {
        let default = self.default_shader;
        let key = |e: &RenderEntity| {
            let render = e.render.borrow();
            let shader = render.shader().map(ShaderHandle::id).or(default);
            (render.z_index(), shader)
        };
        self.entities.sort_by(|a, b| {
            let (za, sa) = key(a);
            let (zb, sb) = key(b);
            za.total_cmp(&zb).then(sa.cmp(&sb))
        });
        self.dirty.set(false);
        tracing::debug!(entities = self.entities.len(), "render order sorted");
    }

    fn draw(&self, ctx: &EngineContext) {
        let camera = {
            let camera = ctx.camera.borrow();
            CameraView {
                x: camera.x(),
                y: camera.y(),
                zoom: camera.zoom(),
            }
        };
        let background = ctx.display.borrow().background;
        let mut frame = ctx.frame.borrow_mut();
        frame.clear();
        frame.push(RenderCommand::Clear { color: background });

        let mut active: Option<ShaderHandle> = None;
        for (_, entity) in self.entities.iter() {
            let render = entity.render.borrow();
            if render.hidden() {
                continue;
            }

            let shader = render
                .shader()
                .unwrap_or_else(|| ctx.shaders.default_shader())
                .clone();
            if active.as_ref() != Some(&shader) {
                if let Some(previous) = &active {
                    previous.borrow_mut().post(&mut frame);
                }
                shader.borrow_mut().pre(&mut frame, camera);
                active = Some(shader.clone());
            }

            let position = entity.space.borrow().position;
            shader.borrow_mut().draw(
                &mut frame,
                render.drawable().texture(),
                render.buffer(),
                position.x,
                position.y,
                0.0,
            );
        }

        if let Some(last) = &active {
            last.borrow_mut().post(&mut frame);
        }
    }
}

impl System<EngineContext> for RenderSystem {
    fn name(&self) -> &str {
        "render"
    }

    fn priority(&self) -> i32 {
        RENDER_PRIORITY
    }

    fn attach(&mut self, ctx: &EngineContext) {
        self.bus = Some(ctx.bus.clone());
        self.default_shader = Some(ctx.shaders.default_shader().id());
        for (_, entity) in self.entities.iter() {
            entity
                .render
                .borrow_mut()
                .set_order_notifier(self.order_notifier());
        }
        self.dirty.set(true);

        let dirty = self.dirty.clone();
        ctx.bus.listen(RenderOrderChanged::KIND, move |_| dirty.set(true));

        let shaders = ctx.shaders.clone();
        let display = ctx.display.clone();
        ctx.bus.listen_for::<WindowResizeMessage, _>(WindowResizeMessage::KIND, move |msg| {
            let size = Viewport::new(msg.new_width as f32, msg.new_height as f32);
            if !display.borrow().scale_on_resize {
                shaders.world().borrow_mut().set_viewport(size);
                shaders.hud().borrow_mut().set_viewport(size);
            }
        });
    }

    fn update(&mut self, ctx: &EngineContext, _dt: f32) {
        if self.dirty.get() {
            self.sort();
        }
        if ctx.headless() {
            return;
        }
        self.draw(ctx);
    }

    fn remove(&mut self, entity: EntityId) {
        if let Some(removed) = self.entities.remove(entity) {
            removed.render.borrow_mut().set_order_notifier(None);
            self.dirty.set(true);
        }
    }

    fn try_add(&mut self, entity: EntityId, bag: &ComponentBag) -> bool {
        match (bag.get::<RenderComponent>(), bag.get::<SpaceComponent>()) {
            (Some(render), Some(space)) => self.add(entity, render, space),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::render::{Color, Drawable, Texture};
    use tessera_ecs::component::shared;
    use tessera_ecs::world::World;

    fn sprite(z: f32) -> Shared<RenderComponent> {
        let drawable = Drawable::from_texture(Texture::solid(2, 2, Color::WHITE));
        shared(RenderComponent::new(drawable).with_z_index(z))
    }

    fn space() -> Shared<SpaceComponent> {
        shared(SpaceComponent::new(Point::ZERO, 2.0, 2.0))
    }

    fn headless_world() -> World<EngineContext> {
        let ctx = EngineContext::default();
        ctx.display.borrow_mut().headless = true;
        let mut world = World::new(ctx);
        world.add_system(RenderSystem::new());
        world
    }

    #[test]
    fn sorts_by_z_index_when_headless() {
        let mut world = headless_world();
        let ids: Vec<EntityId> = (0..3).map(|_| EntityId::next()).collect();
        for (id, z) in ids.iter().zip([2.0, 0.0, 1.0]) {
            let bag = ComponentBag::new().with(sprite(z)).with(space());
            assert_eq!(world.add_entity(*id, &bag), 1);
        }

        world.update(0.016);

        let system = world.system::<RenderSystem>().unwrap();
        assert_eq!(system.draw_order(), vec![ids[1], ids[2], ids[0]]);
        assert!(!system.is_dirty());
        assert!(world.context().frame.borrow().is_empty());
    }

    #[test]
    fn shader_change_marks_dirty() {
        let mut world = headless_world();
        let render = sprite(0.0);
        world.add_entity(
            EntityId::next(),
            &ComponentBag::new().with(render.clone()).with(space()),
        );
        world.update(0.016);
        assert!(!world.system::<RenderSystem>().unwrap().is_dirty());

        let hud = world.context().shaders.hud().clone();
        render.borrow_mut().set_shader(Some(hud));
        assert!(world.system::<RenderSystem>().unwrap().is_dirty());
    }

    #[test]
    fn removed_component_stops_notifying() {
        let mut world = headless_world();
        let id = EntityId::next();
        let render = sprite(0.0);
        world.add_entity(id, &ComponentBag::new().with(render.clone()).with(space()));
        world.remove_entity(id);
        world.update(0.016);

        render.borrow_mut().set_z_index(3.0);
        let system = world.system::<RenderSystem>().unwrap();
        assert!(!system.is_dirty());
        assert!(system.is_empty());
    }

    #[test]
    fn entities_added_before_attach_still_resort() {
        let mut system = RenderSystem::new();
        let (a, b) = (EntityId::next(), EntityId::next());
        let render_a = sprite(0.0);
        system.add(a, render_a.clone(), space());
        system.add(b, sprite(1.0), space());

        let ctx = EngineContext::default();
        ctx.display.borrow_mut().headless = true;
        let mut world = World::new(ctx);
        world.add_system(system);
        world.update(0.016);
        assert_eq!(world.system::<RenderSystem>().unwrap().draw_order(), vec![a, b]);

        render_a.borrow_mut().set_z_index(5.0);
        world.update(0.016);
        assert_eq!(world.system::<RenderSystem>().unwrap().draw_order(), vec![b, a]);
    }

    #[test]
    fn nan_z_index_sorts_last() {
        let mut world = headless_world();
        let ids: Vec<EntityId> = (0..3).map(|_| EntityId::next()).collect();
        for (id, z) in ids.iter().zip([f32::NAN, 1.0, 0.0]) {
            world.add_entity(*id, &ComponentBag::new().with(sprite(z)).with(space()));
        }

        world.update(0.016);

        let order = world.system::<RenderSystem>().unwrap().draw_order();
        assert_eq!(order, vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut system = RenderSystem::new();
        let id = EntityId::next();
        assert!(system.add(id, sprite(0.0), space()));
        assert!(!system.add(id, sprite(1.0), space()));
        assert_eq!(system.len(), 1);
    }
}
