//! The loaded map scene
//!
//! Objects live in a central store; portions hold the ids loaded in each
//! spatial chunk, split into moving and static lists. Dispatch scans in
//! portion order, moving before static, hero first.

use crate::identity::ObjectId;
use crate::object::{MapObject, ObjectTemplate, Position};
use indexmap::IndexMap;

/// A spatial chunk of the map
#[derive(Debug, Clone, Default)]
pub struct Portion {
    pub moving: Vec<ObjectId>,
    pub statics: Vec<ObjectId>,
}

/// The current map's live objects
#[derive(Debug, Default)]
pub struct Scene {
    pub objects: IndexMap<ObjectId, MapObject>,
    pub portions: Vec<Portion>,
    pub templates: IndexMap<i64, ObjectTemplate>,
    next_object_id: i64,
}

impl Scene {
    /// Create a scene holding only the hero
    pub fn new() -> Self {
        let mut scene = Self {
            next_object_id: 1,
            ..Self::default()
        };
        scene
            .objects
            .insert(ObjectId::HERO, MapObject::new(ObjectId::HERO, "hero"));
        scene.portions.push(Portion::default());
        scene
    }

    pub fn hero(&self) -> Option<&MapObject> {
        self.objects.get(&ObjectId::HERO)
    }

    pub fn object(&self, id: ObjectId) -> Option<&MapObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut MapObject> {
        self.objects.get_mut(&id)
    }

    /// Insert an authored object into the store and a portion
    pub fn place(&mut self, object: MapObject, portion: usize) {
        let id = object.id;
        if id.raw() >= self.next_object_id {
            self.next_object_id = id.raw() + 1;
        }
        self.objects.insert(id, object);
        while self.portions.len() <= portion {
            self.portions.push(Portion::default());
        }
        self.portions[portion].statics.push(id);
    }

    /// Spawn a template instance as a moving object, returning its id
    pub fn spawn(&mut self, template_id: i64, position: Position, portion: usize) -> Option<ObjectId> {
        let template = self.templates.get(&template_id)?;
        let id = ObjectId::new(self.next_object_id);
        self.next_object_id += 1;
        let object = template.instance(id, position);
        self.objects.insert(id, object);
        while self.portions.len() <= portion {
            self.portions.push(Portion::default());
        }
        self.portions[portion].moving.push(id);
        Some(id)
    }

    /// Remove an object: it stays in the store, flagged, but leaves every
    /// portion list and no longer reacts
    pub fn remove(&mut self, id: ObjectId) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.removed = true;
        }
        for portion in &mut self.portions {
            portion.moving.retain(|o| *o != id);
            portion.statics.retain(|o| *o != id);
        }
    }

    /// Dispatch scan order: hero first, then per portion moving before static
    pub fn scan(&self) -> Vec<ObjectId> {
        let mut order = Vec::new();
        if self
            .hero()
            .map(|h| !h.removed)
            .unwrap_or(false)
        {
            order.push(ObjectId::HERO);
        }
        for portion in &self.portions {
            for &id in portion.moving.iter().chain(portion.statics.iter()) {
                if id == ObjectId::HERO || order.contains(&id) {
                    continue;
                }
                if self.objects.get(&id).map(|o| !o.removed).unwrap_or(false) {
                    order.push(id);
                }
            }
        }
        order
    }

    /// Find the first object in scan order with the given raw id
    pub fn find_raw(&self, raw_id: i64) -> Option<ObjectId> {
        self.scan().into_iter().find(|id| id.raw() == raw_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_order() {
        let mut scene = Scene::new();
        scene.place(MapObject::new(ObjectId::new(10), "rock"), 0);
        scene.place(MapObject::new(ObjectId::new(11), "tree"), 1);
        let mut guard = MapObject::new(ObjectId::new(12), "guard");
        guard.position = Position::new(2.0, 0.0, 0.0);
        let id = guard.id;
        scene.objects.insert(id, guard);
        scene.portions[0].moving.push(id);

        // hero, portion 0 moving, portion 0 static, portion 1 static
        assert_eq!(
            scene.scan(),
            vec![
                ObjectId::HERO,
                ObjectId::new(12),
                ObjectId::new(10),
                ObjectId::new(11)
            ]
        );

        scene.remove(ObjectId::new(12));
        assert_eq!(
            scene.scan(),
            vec![ObjectId::HERO, ObjectId::new(10), ObjectId::new(11)]
        );
    }

    #[test]
    fn test_spawn_allocates_past_placed_ids() {
        let mut scene = Scene::new();
        scene.place(MapObject::new(ObjectId::new(5), "sign"), 0);
        scene
            .templates
            .insert(1, ObjectTemplate { id: 1, name: "slime".into(), ..Default::default() });
        let id = scene.spawn(1, Position::new(1.0, 0.0, 1.0), 0).unwrap();
        assert_eq!(id, ObjectId::new(6));
        assert!(scene.object(id).unwrap().spawned);
        assert!(scene.spawn(99, Position::default(), 0).is_none());
    }
}
