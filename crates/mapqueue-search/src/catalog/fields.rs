//! Hand-authored field table.
//!
//! Every filterable, sortable or searchable field is one `ModelField`
//! variant. The `id` column is the stable wire identifier used by the codec;
//! never renumber an existing field, append new ones instead.

use super::{Category, DerivedTarget, FieldGroup, FieldSpec, FieldTarget, FieldType, SearchableField};

const fn col(name: &'static str) -> FieldTarget {
    FieldTarget::Column(name)
}

const fn derived(name: &'static str) -> FieldTarget {
    FieldTarget::Derived(name)
}

macro_rules! model_fields {
    ($( $variant:ident = $id:literal : $category:ident . $name:literal => $ty:ident, $target:expr; )*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ModelField {
            $( $variant, )*
        }

        impl ModelField {
            pub const ALL: &'static [ModelField] = &[ $( ModelField::$variant, )* ];

            pub const fn spec(self) -> FieldSpec {
                match self {
                    $(
                        ModelField::$variant => FieldSpec {
                            id: $id,
                            category: Category::$category,
                            name: $name,
                            ty: FieldType::$ty,
                            target: $target,
                        },
                    )*
                }
            }
        }
    };
}

model_fields! {
    // ── profile ──
    ProfileId = 1: Profile."id" => Integer, col("id");
    ProfileUserId = 2: Profile."user_id" => Integer, col("user_id");
    ProfileUsername = 3: Profile."username" => Text, col("username");
    ProfileCountryCode = 4: Profile."country_code" => Text, col("country_code");
    ProfileIsRestricted = 5: Profile."is_restricted" => Boolean, col("is_restricted");
    ProfileIsSupporter = 6: Profile."is_supporter" => Boolean, col("is_supporter");
    ProfileRankedCount = 7: Profile."ranked_beatmapset_count" => Integer, col("ranked_beatmapset_count");
    ProfileGraveyardCount = 8: Profile."graveyard_beatmapset_count" => Integer, col("graveyard_beatmapset_count");
    ProfileKudosuTotal = 9: Profile."kudosu_total" => Integer, col("kudosu_total");
    ProfileUpdatedAt = 10: Profile."updated_at" => Timestamp, col("updated_at");

    // ── item ──
    ItemId = 20: Item."id" => Integer, col("id");
    ItemBeatmapId = 21: Item."beatmap_id" => Integer, col("beatmap_id");
    ItemUserId = 22: Item."user_id" => Integer, col("user_id");
    ItemVersion = 23: Item."version" => Text, col("version");
    ItemMode = 24: Item."mode" => Text, col("mode");
    ItemStatus = 25: Item."status" => Text, col("status");
    ItemDifficultyRating = 26: Item."difficulty_rating" => Float, col("difficulty_rating");
    ItemAccuracy = 27: Item."accuracy" => Float, col("accuracy");
    ItemAr = 28: Item."ar" => Float, col("ar");
    ItemBpm = 29: Item."bpm" => Float, col("bpm");
    ItemCs = 30: Item."cs" => Float, col("cs");
    ItemDrain = 31: Item."drain" => Float, col("drain");
    ItemHitLength = 32: Item."hit_length" => Integer, col("hit_length");
    ItemTotalLength = 33: Item."total_length" => Integer, col("total_length");
    ItemMaxCombo = 34: Item."max_combo" => Integer, col("max_combo");
    ItemCountCircles = 35: Item."count_circles" => Integer, col("count_circles");
    ItemCountSliders = 36: Item."count_sliders" => Integer, col("count_sliders");
    ItemCountSpinners = 37: Item."count_spinners" => Integer, col("count_spinners");
    ItemPlaycount = 38: Item."playcount" => Integer, col("playcount");
    ItemPasscount = 39: Item."passcount" => Integer, col("passcount");
    ItemIsScoreable = 40: Item."is_scoreable" => Boolean, col("is_scoreable");
    ItemChecksum = 41: Item."checksum" => Text, col("checksum");
    ItemLastUpdated = 42: Item."last_updated" => Timestamp, col("last_updated");
    ItemDeletedAt = 43: Item."deleted_at" => Timestamp, col("deleted_at");

    // ── item_set ──
    ItemSetId = 60: ItemSet."id" => Integer, col("id");
    ItemSetBeatmapsetId = 61: ItemSet."beatmapset_id" => Integer, col("beatmapset_id");
    ItemSetUserId = 62: ItemSet."user_id" => Integer, col("user_id");
    ItemSetArtist = 63: ItemSet."artist" => Text, col("artist");
    ItemSetArtistUnicode = 64: ItemSet."artist_unicode" => Text, col("artist_unicode");
    ItemSetTitle = 65: ItemSet."title" => Text, col("title");
    ItemSetTitleUnicode = 66: ItemSet."title_unicode" => Text, col("title_unicode");
    ItemSetCreator = 67: ItemSet."creator" => Text, col("creator");
    ItemSetSource = 68: ItemSet."source" => Text, col("source");
    ItemSetTags = 69: ItemSet."tags" => Text, col("tags");
    ItemSetDescription = 70: ItemSet."description_description" => Text, derived("item_set_description");
    ItemSetGenreName = 71: ItemSet."genre_name" => Text, derived("item_set_genre");
    ItemSetLanguageName = 72: ItemSet."language_name" => Text, derived("item_set_language");
    ItemSetBpm = 73: ItemSet."bpm" => Float, col("bpm");
    ItemSetRating = 74: ItemSet."rating" => Float, col("rating");
    ItemSetFavouriteCount = 75: ItemSet."favourite_count" => Integer, col("favourite_count");
    ItemSetPlayCount = 76: ItemSet."play_count" => Integer, col("play_count");
    ItemSetStatus = 77: ItemSet."status" => Text, col("status");
    ItemSetNsfw = 78: ItemSet."nsfw" => Boolean, col("nsfw");
    ItemSetVideo = 79: ItemSet."video" => Boolean, col("video");
    ItemSetSpotlight = 80: ItemSet."spotlight" => Boolean, col("spotlight");
    ItemSetSubmittedDate = 81: ItemSet."submitted_date" => Timestamp, col("submitted_date");
    ItemSetRankedDate = 82: ItemSet."ranked_date" => Timestamp, col("ranked_date");
    ItemSetLastUpdated = 83: ItemSet."last_updated" => Timestamp, col("last_updated");

    // ── queue ──
    QueueId = 100: Queue."id" => Integer, col("id");
    QueueUserId = 101: Queue."user_id" => Integer, col("user_id");
    QueueName = 102: Queue."name" => Text, col("name");
    QueueDescription = 103: Queue."description" => Text, col("description");
    QueueIsOpen = 104: Queue."is_open" => Boolean, col("is_open");
    QueueVisibility = 105: Queue."visibility" => Text, col("visibility");
    QueueRequestCount = 106: Queue."request_count" => Integer, derived("queue_request_count");
    QueueCreatedAt = 107: Queue."created_at" => Timestamp, col("created_at");
    QueueUpdatedAt = 108: Queue."updated_at" => Timestamp, col("updated_at");

    // ── request ──
    RequestId = 120: Request."id" => Integer, col("id");
    RequestUserId = 121: Request."user_id" => Integer, col("user_id");
    RequestBeatmapsetId = 122: Request."beatmapset_id" => Integer, col("beatmapset_id");
    RequestQueueId = 123: Request."queue_id" => Integer, col("queue_id");
    RequestComment = 124: Request."comment" => Text, col("comment");
    RequestStatus = 125: Request."status" => Text, col("status");
    RequestMvChecked = 126: Request."mv_checked" => Boolean, col("mv_checked");
    RequestCreatedAt = 127: Request."created_at" => Timestamp, col("created_at");
    RequestUpdatedAt = 128: Request."updated_at" => Timestamp, col("updated_at");
}

/// Alternative names accepted on input. Output always uses the canonical name.
pub(crate) const FIELD_ALIASES: &[(ModelField, &str)] = &[
    (ModelField::ItemDifficultyRating, "rating"),
    (ModelField::ItemSetDescription, "description"),
    (ModelField::ItemSetGenreName, "genre"),
    (ModelField::ItemSetLanguageName, "language"),
];

/// Fields eligible for term matching, in wire bit order.
pub const SEARCHABLE_FIELDS: &[SearchableField] = &[
    SearchableField::new(ModelField::ItemVersion, 2),
    SearchableField::new(ModelField::ItemSetTitle, 5),
    SearchableField::new(ModelField::ItemSetTitleUnicode, 5),
    SearchableField::new(ModelField::ItemSetArtist, 4),
    SearchableField::new(ModelField::ItemSetArtistUnicode, 4),
    SearchableField::new(ModelField::ItemSetCreator, 3),
    SearchableField::new(ModelField::ItemSetSource, 2),
    SearchableField::new(ModelField::ItemSetTags, 1),
    SearchableField::new(ModelField::ItemSetDescription, 0),
    SearchableField::new(ModelField::QueueName, 6),
    SearchableField::new(ModelField::QueueDescription, 0),
    SearchableField::new(ModelField::RequestComment, 0),
];

pub(crate) const FIELD_GROUPS: &[FieldGroup] = &[
    FieldGroup {
        name: "title",
        members: &[ModelField::ItemSetTitle, ModelField::ItemSetTitleUnicode],
    },
    FieldGroup {
        name: "artist",
        members: &[ModelField::ItemSetArtist, ModelField::ItemSetArtistUnicode],
    },
];

/// Named sub-queries backing derived fields. Each yields `(id, target)` keyed
/// by the owning category's primary key.
pub(crate) const DERIVED_TARGETS: &[DerivedTarget] = &[
    DerivedTarget {
        name: "item_set_description",
        category: Category::ItemSet,
        sql: "SELECT id, description->>'description' AS target FROM beatmapset_snapshots",
    },
    DerivedTarget {
        name: "item_set_genre",
        category: Category::ItemSet,
        sql: "SELECT id, genre->>'name' AS target FROM beatmapset_snapshots",
    },
    DerivedTarget {
        name: "item_set_language",
        category: Category::ItemSet,
        sql: "SELECT id, language->>'name' AS target FROM beatmapset_snapshots",
    },
    DerivedTarget {
        name: "queue_request_count",
        category: Category::Queue,
        sql: "SELECT q.id, count(r.id)::bigint AS target FROM queues q \
              LEFT JOIN requests r ON r.queue_id = q.id GROUP BY q.id",
    },
];
