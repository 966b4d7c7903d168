//! Default-field and default-query passes (spec §4.1 steps 1-2), run once per
//! entity after its statements have been evaluated and before inverse-edge
//! synthesis sees it.

use erm_core::{Entity, Field, FieldType};

/// If no field on `entity` is primary, prepend a UUIDv7 primary named `id`.
///
/// The column carries no SQL-level default; `id_generation` annotation marks
/// it for client-side generation via `uuid::Uuid::now_v7()` at insert time
/// (spec leaves the generation mechanism to the runtime, not the database).
pub fn apply_default_field(entity: &mut Entity) {
    if entity.fields.iter().any(|f| f.primary) {
        return;
    }
    let mut id = Field::new("id", FieldType::Uuid);
    id.primary = true;
    id.annotations.insert("id_generation".to_string(), "uuidv7".to_string());
    entity.fields.insert(0, id);
}

/// Fill missing predicates/orders/aggregates and the default limit.
pub fn apply_default_query(entity: &mut Entity) {
    let primary_name = entity
        .primary_field()
        .map(|f| f.name.clone())
        .unwrap_or_else(|| "id".to_string());
    entity.query.apply_defaults(&primary_name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use erm_core::FieldType as FT;

    #[test]
    fn prepends_uuid_primary_when_none_declared() {
        let mut entity = Entity::new("Widget");
        entity.fields.push(Field::new("label", FT::Text));
        apply_default_field(&mut entity);
        assert_eq!(entity.fields[0].name, "id");
        assert!(entity.fields[0].primary);
        assert_eq!(entity.fields[0].ty, FT::Uuid);
        assert_eq!(entity.fields[1].name, "label");
    }

    #[test]
    fn leaves_existing_primary_untouched() {
        let mut entity = Entity::new("Widget");
        let mut explicit = Field::new("sku", FT::Text);
        explicit.primary = true;
        entity.fields.push(explicit);
        apply_default_field(&mut entity);
        assert_eq!(entity.fields.len(), 1);
        assert_eq!(entity.fields[0].name, "sku");
    }

    #[test]
    fn fills_default_query_when_empty() {
        let mut entity = Entity::new("Widget");
        entity.fields.push({
            let mut f = Field::new("id", FT::Uuid);
            f.primary = true;
            f
        });
        apply_default_query(&mut entity);
        assert_eq!(entity.query.predicates.len(), 1);
        assert_eq!(entity.query.orders.len(), 1);
        assert_eq!(entity.query.aggregates.len(), 1);
        assert_eq!(entity.query.default_limit, 20);
    }
}
