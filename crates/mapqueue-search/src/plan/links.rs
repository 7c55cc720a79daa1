//! How each category is reached from each scope's root row.
//!
//! Every link is a join chain from the root alias `r` to the category alias
//! `c`. Within a chain, `q` is a request, `sl` a current item-set listing and
//! `b` a row of the item ↔ item-set bridge.

use crate::catalog::{Category, Scope};
use crate::error::{Result, SearchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one category row per root: join directly.
    One,
    /// Many category rows per root: aggregate per root id.
    Many,
}

#[derive(Debug, Clone, Copy)]
pub struct Link {
    pub joins: &'static str,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Copy)]
pub struct Root {
    pub table: &'static str,
    /// Restricts the root to current snapshots, where the scope has versions.
    pub listing: Option<&'static str>,
}

pub fn root(scope: Scope) -> Root {
    match scope {
        Scope::Items => Root {
            table: "beatmap_snapshots",
            listing: Some("JOIN beatmap_listings rl ON rl.beatmap_snapshot_id = r.id"),
        },
        Scope::ItemSets => Root {
            table: "beatmapset_snapshots",
            listing: Some("JOIN beatmapset_listings rl ON rl.beatmapset_snapshot_id = r.id"),
        },
        Scope::Queues => Root {
            table: "queues",
            listing: None,
        },
        Scope::Requests => Root {
            table: "requests",
            listing: None,
        },
    }
}

const fn one(joins: &'static str) -> Option<Link> {
    Some(Link {
        joins,
        cardinality: Cardinality::One,
    })
}

const fn many(joins: &'static str) -> Option<Link> {
    Some(Link {
        joins,
        cardinality: Cardinality::Many,
    })
}

const PROFILE_OF_OWNER: &str = "JOIN profiles c ON c.user_id = r.user_id";

fn lookup(scope: Scope, category: Category) -> Option<Link> {
    use Category as C;
    use Scope as S;
    match (scope, category) {
        (S::Items, C::Item) => one("JOIN beatmap_snapshots c ON c.id = r.id"),

        (S::ItemSets, C::Profile) => one(PROFILE_OF_OWNER),
        (S::ItemSets, C::Item) => many(
            "JOIN beatmap_snapshot_beatmapset_snapshot b ON b.beatmapset_snapshot_id = r.id \
             JOIN beatmap_snapshots c ON c.id = b.beatmap_snapshot_id",
        ),
        (S::ItemSets, C::ItemSet) => one("JOIN beatmapset_snapshots c ON c.id = r.id"),

        (S::Queues, C::Profile) => one(PROFILE_OF_OWNER),
        (S::Queues, C::Item) => many(
            "JOIN requests q ON q.queue_id = r.id \
             JOIN beatmapset_listings sl ON sl.beatmapset_id = q.beatmapset_id \
             JOIN beatmap_snapshot_beatmapset_snapshot b ON b.beatmapset_snapshot_id = sl.beatmapset_snapshot_id \
             JOIN beatmap_snapshots c ON c.id = b.beatmap_snapshot_id",
        ),
        (S::Queues, C::ItemSet) => many(
            "JOIN requests q ON q.queue_id = r.id \
             JOIN beatmapset_listings sl ON sl.beatmapset_id = q.beatmapset_id \
             JOIN beatmapset_snapshots c ON c.id = sl.beatmapset_snapshot_id",
        ),
        (S::Queues, C::Queue) => one("JOIN queues c ON c.id = r.id"),
        (S::Queues, C::Request) => many("JOIN requests c ON c.queue_id = r.id"),

        (S::Requests, C::Profile) => one(PROFILE_OF_OWNER),
        (S::Requests, C::Item) => many(
            "JOIN beatmapset_listings sl ON sl.beatmapset_id = r.beatmapset_id \
             JOIN beatmap_snapshot_beatmapset_snapshot b ON b.beatmapset_snapshot_id = sl.beatmapset_snapshot_id \
             JOIN beatmap_snapshots c ON c.id = b.beatmap_snapshot_id",
        ),
        (S::Requests, C::ItemSet) => one(
            "JOIN beatmapset_listings sl ON sl.beatmapset_id = r.beatmapset_id \
             JOIN beatmapset_snapshots c ON c.id = sl.beatmapset_snapshot_id",
        ),
        (S::Requests, C::Queue) => one("JOIN queues c ON c.id = r.queue_id"),
        (S::Requests, C::Request) => one("JOIN requests c ON c.id = r.id"),

        _ => None,
    }
}

pub fn link(scope: Scope, category: Category) -> Result<Link> {
    lookup(scope, category).ok_or_else(|| {
        SearchError::Composition(format!(
            "no relationship from scope {scope} to category {category}"
        ))
    })
}

/// `FROM <root> r <joins>` for a link, without the listing restriction.
pub fn from_root(scope: Scope, link: &Link) -> String {
    format!("FROM {} r {}", root(scope).table, link.joins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;

    #[test]
    fn every_allowed_pair_has_a_link() {
        let catalog = FieldCatalog::new();
        for scope in Scope::ALL {
            for category in Category::ALL {
                let allowed = catalog.in_scope(scope, category);
                assert_eq!(
                    lookup(scope, category).is_some(),
                    allowed,
                    "{scope} / {category}"
                );
            }
        }
    }

    #[test]
    fn root_category_is_a_self_link() {
        for scope in Scope::ALL {
            let l = link(scope, scope.root_category()).unwrap();
            assert_eq!(l.cardinality, Cardinality::One);
            assert!(l.joins.ends_with("c.id = r.id"), "{scope}");
        }
    }

    #[test]
    fn children_below_the_root_aggregate() {
        assert_eq!(link(Scope::Queues, Category::Item).unwrap().cardinality, Cardinality::Many);
        assert_eq!(link(Scope::ItemSets, Category::Item).unwrap().cardinality, Cardinality::Many);
        assert_eq!(link(Scope::Requests, Category::ItemSet).unwrap().cardinality, Cardinality::One);
        assert!(matches!(
            link(Scope::Items, Category::Queue),
            Err(SearchError::Composition(_))
        ));
    }
}
