//! Related records embedded in each result row.
//!
//! Each relation is a correlated sub-query over the root alias `r` yielding
//! one `jsonb` value: an object for to-one relations, an array (never null)
//! for to-many ones.

use crate::catalog::Scope;
use crate::error::{Result, SearchError};

#[derive(Debug, PartialEq, Eq)]
pub struct RelationSpec {
    pub name: &'static str,
    pub sql: &'static str,
}

const PROFILE_OF_OWNER: &str = "(SELECT to_jsonb(p.*) FROM profiles p WHERE p.user_id = r.user_id)";

const ITEM_RELATIONS: &[RelationSpec] = &[RelationSpec {
    name: "item_sets",
    sql: "(SELECT coalesce(jsonb_agg(to_jsonb(s.*) ORDER BY s.id), '[]'::jsonb) \
          FROM beatmap_snapshot_beatmapset_snapshot b \
          JOIN beatmapset_snapshots s ON s.id = b.beatmapset_snapshot_id \
          WHERE b.beatmap_snapshot_id = r.id)",
}];

const ITEM_SET_RELATIONS: &[RelationSpec] = &[
    RelationSpec {
        name: "items",
        sql: "(SELECT coalesce(jsonb_agg(to_jsonb(i.*) ORDER BY i.difficulty_rating, i.id), '[]'::jsonb) \
              FROM beatmap_snapshot_beatmapset_snapshot b \
              JOIN beatmap_snapshots i ON i.id = b.beatmap_snapshot_id \
              WHERE b.beatmapset_snapshot_id = r.id)",
    },
    RelationSpec {
        name: "creator_profile",
        sql: PROFILE_OF_OWNER,
    },
];

const QUEUE_RELATIONS: &[RelationSpec] = &[
    RelationSpec {
        name: "owner",
        sql: PROFILE_OF_OWNER,
    },
    RelationSpec {
        name: "requests",
        sql: "(SELECT coalesce(jsonb_agg(to_jsonb(q.*) ORDER BY q.id), '[]'::jsonb) \
              FROM requests q WHERE q.queue_id = r.id)",
    },
];

const REQUEST_RELATIONS: &[RelationSpec] = &[
    RelationSpec {
        name: "item_set",
        sql: "(SELECT to_jsonb(s.*) FROM beatmapset_listings sl \
              JOIN beatmapset_snapshots s ON s.id = sl.beatmapset_snapshot_id \
              WHERE sl.beatmapset_id = r.beatmapset_id)",
    },
    RelationSpec {
        name: "queue",
        sql: "(SELECT to_jsonb(q.*) FROM queues q WHERE q.id = r.queue_id)",
    },
    RelationSpec {
        name: "requester",
        sql: PROFILE_OF_OWNER,
    },
];

pub fn available(scope: Scope) -> &'static [RelationSpec] {
    match scope {
        Scope::Items => ITEM_RELATIONS,
        Scope::ItemSets => ITEM_SET_RELATIONS,
        Scope::Queues => QUEUE_RELATIONS,
        Scope::Requests => REQUEST_RELATIONS,
    }
}

pub fn find(scope: Scope, name: &str) -> Option<&'static RelationSpec> {
    available(scope).iter().find(|r| r.name == name)
}

/// Relations by name, in request order, without repeats.
pub fn resolve<S: AsRef<str>>(scope: Scope, names: &[S]) -> Result<Vec<&'static RelationSpec>> {
    let mut out: Vec<&'static RelationSpec> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        let relation = find(scope, name).ok_or_else(|| {
            SearchError::invalid(
                format!("include.{name}"),
                format!("scope {scope} has no relation {name}"),
            )
        })?;
        if !out.contains(&relation) {
            out.push(relation);
        }
    }
    Ok(out)
}

/// Relations embedded when results are dumped for the web frontend.
pub fn frontend(scope: Scope) -> &'static [RelationSpec] {
    match scope {
        Scope::Items => &[],
        Scope::ItemSets => ITEM_SET_RELATIONS,
        Scope::Queues => &QUEUE_RELATIONS[..1],
        Scope::Requests => REQUEST_RELATIONS,
    }
}
