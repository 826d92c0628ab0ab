use crate::entities::unit::{self, Entity as UnitEntity};
use once_cell::sync::Lazy;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::warn;

/// Fallback multipliers used when the unit registry has no row for a code.
static FALLBACK_MULTIPLIERS: Lazy<Vec<(&'static str, i32)>> = Lazy::new(|| {
    vec![
        ("PCS", 1),
        ("KG", 1),
        ("LTR", 1),
        ("BOX", 12),
        ("CARTON", 24),
        ("DOZEN", 12),
    ]
});

/// Resolves a unit-of-measure code to an integer multiplier of the
/// product's base unit.
///
/// Lookup order: the `units` registry (keyed by uppercased abbreviation),
/// then the static fallback table, then 1. An unknown unit degrades to
/// 1:1 rather than blocking an order. The registry is
/// mutable reference data, so the result is re-read on every call and
/// must not be cached across requests.
pub async fn multiplier<C: ConnectionTrait>(db: &C, code: &str) -> i32 {
    let upper = code.trim().to_uppercase();

    match UnitEntity::find()
        .filter(unit::Column::Abbreviation.eq(upper.clone()))
        .one(db)
        .await
    {
        Ok(Some(u)) if u.multiplier >= 1 => return u.multiplier,
        Ok(_) => {}
        Err(e) => {
            // Registry unavailability falls through to the static table.
            warn!(unit = %upper, error = %e, "Unit registry lookup failed");
        }
    }

    fallback_multiplier(&upper)
}

fn fallback_multiplier(upper: &str) -> i32 {
    FALLBACK_MULTIPLIERS
        .iter()
        .find(|(code, _)| *code == upper)
        .map(|(_, m)| *m)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveModelTrait;

    #[test]
    fn fallback_covers_known_codes() {
        assert_eq!(fallback_multiplier("PCS"), 1);
        assert_eq!(fallback_multiplier("BOX"), 12);
        assert_eq!(fallback_multiplier("CARTON"), 24);
        assert_eq!(fallback_multiplier("DOZEN"), 12);
    }

    #[test]
    fn unknown_unit_degrades_to_one() {
        assert_eq!(fallback_multiplier("PALLET"), 1);
        assert_eq!(fallback_multiplier(""), 1);
    }

    #[tokio::test]
    async fn registry_miss_uses_fallback() {
        let db = crate::db::establish_connection("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&db).await.unwrap();

        assert_eq!(multiplier(&db, "box").await, 12);
        assert_eq!(multiplier(&db, " Dozen ").await, 12);
        assert_eq!(multiplier(&db, "bottle").await, 1);
    }

    #[tokio::test]
    async fn registry_row_overrides_fallback() {
        let db = crate::db::establish_connection("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&db).await.unwrap();

        unit::ActiveModel {
            id: sea_orm::Set(uuid::Uuid::new_v4()),
            abbreviation: sea_orm::Set("BOX".to_string()),
            name: sea_orm::Set("Box of ten".to_string()),
            multiplier: sea_orm::Set(10),
        }
        .insert(&db)
        .await
        .unwrap();

        assert_eq!(multiplier(&db, "box").await, 10);
    }

    #[tokio::test]
    async fn registry_error_uses_fallback() {
        // No migrations: the registry query fails and the static table
        // takes over.
        let db = crate::db::establish_connection("sqlite::memory:")
            .await
            .unwrap();

        assert_eq!(multiplier(&db, "carton").await, 24);
        assert_eq!(multiplier(&db, "bottle").await, 1);
    }
}
