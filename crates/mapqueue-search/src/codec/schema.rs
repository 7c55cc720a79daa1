use super::value::{read_bool, read_value, write_value};
use super::wire::{Reader, Writer};
use super::{CodecError, Decode, Encode, SCHEMA_VERSION};
use crate::catalog::{Category, FieldCatalog, ModelField, Scope, SEARCHABLE_FIELDS};
use crate::model::{
    ConditionValue, Conditions, FieldFilters, FieldWeights, FiltersSchema, Operator, PatternKind,
    PatternMultipliers, SearchSchema, SearchTermsSchema, SortingOption, SortingOrder,
    SortingSchema,
};

const HAS_TERMS: u8 = 1 << 0;
const HAS_SORTING: u8 = 1 << 1;
const HAS_FILTERS: u8 = 1 << 2;
const CASE_SENSITIVE: u8 = 1 << 0;

fn count_u8(what: &'static str, n: usize) -> Result<u8, CodecError> {
    u8::try_from(n).map_err(|_| CodecError::TooMany { what, count: n })
}

fn read_field(r: &mut Reader<'_>, catalog: &FieldCatalog) -> Result<ModelField, CodecError> {
    let offset = r.offset();
    let id = r.u16()?;
    catalog
        .field_for_id(id)
        .ok_or(CodecError::UnknownFieldId { offset, id })
}

fn check_flags(offset: usize, bits: u16, known: u16) -> Result<(), CodecError> {
    if bits & !known != 0 {
        return Err(CodecError::UnknownFlags { offset, bits });
    }
    Ok(())
}

// ── Conditions ─────────────────────────────────────────────────

fn write_list(w: &mut Writer, values: &[ConditionValue]) -> Result<(), CodecError> {
    w.varint(values.len() as u64);
    values.iter().try_for_each(|v| write_value(w, v))
}

fn read_list(r: &mut Reader<'_>) -> Result<Vec<ConditionValue>, CodecError> {
    let n = r.len_prefix()?;
    (0..n).map(|_| read_value(r)).collect()
}

impl Encode for Conditions {
    fn encode(&self, w: &mut Writer, _catalog: &FieldCatalog) -> Result<(), CodecError> {
        let presence = self.operators().fold(0u16, |acc, op| acc | op.bit());
        w.u16(presence);
        for op in self.operators() {
            match op {
                Operator::In => write_list(w, self.in_.as_deref().unwrap_or_default())?,
                Operator::NotIn => write_list(w, self.not_in.as_deref().unwrap_or_default())?,
                Operator::IsNull => w.u8(u8::from(self.is_null == Some(true))),
                Operator::Regex => w.str(self.regex.as_deref().unwrap_or_default()),
                Operator::NotRegex => w.str(self.not_regex.as_deref().unwrap_or_default()),
                scalar => {
                    if let Some(v) = self.scalar(scalar) {
                        write_value(w, v)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Decode for Conditions {
    fn decode(r: &mut Reader<'_>, _catalog: &FieldCatalog) -> Result<Self, CodecError> {
        let offset = r.offset();
        let presence = r.u16()?;
        let known = Operator::ALL.iter().fold(0u16, |acc, op| acc | op.bit());
        check_flags(offset, presence, known)?;

        let mut c = Conditions::default();
        for op in Operator::ALL.into_iter().filter(|op| presence & op.bit() != 0) {
            match op {
                Operator::In => c.in_ = Some(read_list(r)?),
                Operator::NotIn => c.not_in = Some(read_list(r)?),
                Operator::IsNull => c.is_null = Some(read_bool(r)?),
                Operator::Regex => c.regex = Some(r.str()?),
                Operator::NotRegex => c.not_regex = Some(r.str()?),
                scalar => {
                    let v = read_value(r)?;
                    if let Some(slot) = c.scalar_mut(scalar) {
                        *slot = Some(v);
                    }
                }
            }
        }
        Ok(c)
    }
}

// ── Filters ────────────────────────────────────────────────────

impl Encode for FieldFilters {
    fn encode(&self, w: &mut Writer, catalog: &FieldCatalog) -> Result<(), CodecError> {
        w.u8(count_u8("filtered fields", self.fields.len())?);
        for (field, conditions) in &self.fields {
            w.u16(catalog.id_for(*field));
            conditions.encode(w, catalog)?;
        }
        Ok(())
    }
}

fn decode_field_filters(
    r: &mut Reader<'_>,
    catalog: &FieldCatalog,
    category: Category,
) -> Result<FieldFilters, CodecError> {
    let n = r.u8()?;
    let mut filters = FieldFilters::new(category);
    for _ in 0..n {
        let offset = r.offset();
        let field = read_field(r, catalog)?;
        if field.category() != category {
            return Err(CodecError::FieldCategoryMismatch {
                offset,
                field: field.qualified_name(),
                category,
            });
        }
        let conditions = Conditions::decode(r, catalog)?;
        if filters.fields.insert(field, conditions).is_some() {
            return Err(CodecError::DuplicateField {
                offset,
                id: catalog.id_for(field),
            });
        }
    }
    Ok(filters)
}

impl Encode for FiltersSchema {
    fn encode(&self, w: &mut Writer, catalog: &FieldCatalog) -> Result<(), CodecError> {
        let presence = self
            .categories
            .keys()
            .fold(0u8, |acc, c| acc | (1 << c.bit()));
        w.u8(presence);
        for category in Category::ALL {
            if let Some(filters) = self.categories.get(&category) {
                filters.encode(w, catalog)?;
            }
        }
        Ok(())
    }
}

impl Decode for FiltersSchema {
    fn decode(r: &mut Reader<'_>, catalog: &FieldCatalog) -> Result<Self, CodecError> {
        let offset = r.offset();
        let presence = r.u8()?;
        let known = Category::ALL.iter().fold(0u8, |acc, c| acc | (1 << c.bit()));
        check_flags(offset, presence as u16, known as u16)?;

        let mut schema = FiltersSchema::default();
        for category in Category::ALL {
            if presence & (1 << category.bit()) != 0 {
                let filters = decode_field_filters(r, catalog, category)?;
                schema.categories.insert(category, filters);
            }
        }
        Ok(schema)
    }
}

// ── Search terms ───────────────────────────────────────────────

impl Encode for PatternMultipliers {
    fn encode(&self, w: &mut Writer, _catalog: &FieldCatalog) -> Result<(), CodecError> {
        let defaults = PatternMultipliers::default();
        let mut presence = 0u8;
        let mut nulls = 0u8;
        let mut values = Vec::new();
        for kind in PatternKind::ALL {
            let v = self.get(kind);
            if v == defaults.get(kind) {
                continue;
            }
            presence |= kind.bit();
            match v {
                Some(m) => values.push(m),
                None => nulls |= kind.bit(),
            }
        }
        w.u8(presence);
        w.u8(nulls);
        values.into_iter().for_each(|v| w.i8(v));
        Ok(())
    }
}

impl Decode for PatternMultipliers {
    fn decode(r: &mut Reader<'_>, _catalog: &FieldCatalog) -> Result<Self, CodecError> {
        let offset = r.offset();
        let presence = r.u8()?;
        let nulls = r.u8()?;
        let known = PatternKind::ALL.iter().fold(0u8, |acc, k| acc | k.bit());
        check_flags(offset, presence as u16, known as u16)?;
        check_flags(offset + 1, nulls as u16, presence as u16)?;

        let mut m = PatternMultipliers::default();
        for kind in PatternKind::ALL {
            if presence & kind.bit() == 0 {
                continue;
            }
            let v = if nulls & kind.bit() != 0 {
                None
            } else {
                Some(r.i8()?)
            };
            m.set(kind, v);
        }
        Ok(m)
    }
}

impl Encode for FieldWeights {
    fn encode(&self, w: &mut Writer, _catalog: &FieldCatalog) -> Result<(), CodecError> {
        let mut presence = 0u16;
        let mut nulls = 0u16;
        let mut values = Vec::new();
        for (i, s) in SEARCHABLE_FIELDS.iter().enumerate() {
            if self.is_default(s.field) {
                continue;
            }
            presence |= 1 << i;
            match self.get(s.field) {
                Some(weight) => values.push(weight),
                None => nulls |= 1 << i,
            }
        }
        w.u16(presence);
        w.u16(nulls);
        values.into_iter().for_each(|v| w.i8(v));
        Ok(())
    }
}

impl Decode for FieldWeights {
    fn decode(r: &mut Reader<'_>, _catalog: &FieldCatalog) -> Result<Self, CodecError> {
        let offset = r.offset();
        let presence = r.u16()?;
        let nulls = r.u16()?;
        let known = ((1u32 << SEARCHABLE_FIELDS.len()) - 1) as u16;
        check_flags(offset, presence, known)?;
        check_flags(offset + 2, nulls, presence)?;

        let mut weights = FieldWeights::default();
        for (i, s) in SEARCHABLE_FIELDS.iter().enumerate() {
            if presence & (1 << i) == 0 {
                continue;
            }
            let v = if nulls & (1 << i) != 0 {
                None
            } else {
                Some(r.i8()?)
            };
            weights.set(s.field, v);
        }
        Ok(weights)
    }
}

impl Encode for SearchTermsSchema {
    fn encode(&self, w: &mut Writer, catalog: &FieldCatalog) -> Result<(), CodecError> {
        w.varint(self.terms.len() as u64);
        for term in &self.terms {
            w.str(term);
        }
        w.u8(if self.case_sensitive { CASE_SENSITIVE } else { 0 });
        self.pattern_multipliers.encode(w, catalog)?;
        self.field_weights.encode(w, catalog)
    }
}

impl Decode for SearchTermsSchema {
    fn decode(r: &mut Reader<'_>, catalog: &FieldCatalog) -> Result<Self, CodecError> {
        let n = r.len_prefix()?;
        let terms = (0..n).map(|_| r.str()).collect::<Result<Vec<_>, _>>()?;
        let offset = r.offset();
        let flags = r.u8()?;
        check_flags(offset, flags as u16, CASE_SENSITIVE as u16)?;
        Ok(SearchTermsSchema {
            terms,
            case_sensitive: flags & CASE_SENSITIVE != 0,
            pattern_multipliers: PatternMultipliers::decode(r, catalog)?,
            field_weights: FieldWeights::decode(r, catalog)?,
        })
    }
}

// ── Sorting ────────────────────────────────────────────────────

impl Encode for SortingSchema {
    fn encode(&self, w: &mut Writer, catalog: &FieldCatalog) -> Result<(), CodecError> {
        w.u8(count_u8("sort options", self.options.len())?);
        for option in &self.options {
            w.u16(catalog.id_for(option.field));
            w.u8(option.order.id());
        }
        Ok(())
    }
}

impl Decode for SortingSchema {
    fn decode(r: &mut Reader<'_>, catalog: &FieldCatalog) -> Result<Self, CodecError> {
        let n = r.u8()?;
        let mut options = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let field = read_field(r, catalog)?;
            let offset = r.offset();
            let id = r.u8()?;
            let order = SortingOrder::from_id(id).ok_or(CodecError::UnknownTag { offset, tag: id })?;
            options.push(SortingOption { field, order });
        }
        Ok(SortingSchema { options })
    }
}

// ── SearchSchema ───────────────────────────────────────────────

impl Encode for SearchSchema {
    fn encode(&self, w: &mut Writer, catalog: &FieldCatalog) -> Result<(), CodecError> {
        w.u8(SCHEMA_VERSION);
        w.u8(self.scope.id());
        let mut presence = 0u8;
        if self.search_terms.is_some() {
            presence |= HAS_TERMS;
        }
        if self.sorting.is_some() {
            presence |= HAS_SORTING;
        }
        if self.filters.is_some() {
            presence |= HAS_FILTERS;
        }
        w.u8(presence);
        if let Some(terms) = &self.search_terms {
            terms.encode(w, catalog)?;
        }
        if let Some(sorting) = &self.sorting {
            sorting.encode(w, catalog)?;
        }
        if let Some(filters) = &self.filters {
            filters.encode(w, catalog)?;
        }
        Ok(())
    }
}

impl Decode for SearchSchema {
    fn decode(r: &mut Reader<'_>, catalog: &FieldCatalog) -> Result<Self, CodecError> {
        let offset = r.offset();
        let version = r.u8()?;
        if version != SCHEMA_VERSION {
            return Err(CodecError::UnsupportedVersion { offset, version });
        }
        let offset = r.offset();
        let id = r.u8()?;
        let scope = Scope::from_id(id).ok_or(CodecError::UnknownScope { offset, id })?;

        let offset = r.offset();
        let presence = r.u8()?;
        check_flags(offset, presence as u16, (HAS_TERMS | HAS_SORTING | HAS_FILTERS) as u16)?;

        let mut schema = SearchSchema::new(scope);
        if presence & HAS_TERMS != 0 {
            schema.search_terms = Some(SearchTermsSchema::decode(r, catalog)?);
        }
        if presence & HAS_SORTING != 0 {
            schema.sorting = Some(SortingSchema::decode(r, catalog)?);
        }
        if presence & HAS_FILTERS != 0 {
            schema.filters = Some(FiltersSchema::decode(r, catalog)?);
        }
        Ok(schema)
    }
}

/// Filters keyed by field, used by tests building schemas by hand.
#[cfg(test)]
pub(crate) fn filters_of(entries: Vec<(ModelField, Conditions)>) -> FiltersSchema {
    let mut categories = std::collections::BTreeMap::new();
    for (field, conditions) in entries {
        categories
            .entry(field.category())
            .or_insert_with(|| FieldFilters::new(field.category()))
            .fields
            .insert(field, conditions);
    }
    FiltersSchema { categories }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_schema, encode_schema};
    use crate::model::value::parse_timestamp;

    fn round_trip(schema: &SearchSchema) -> SearchSchema {
        let catalog = FieldCatalog::new();
        let bytes = encode_schema(schema, &catalog).unwrap();
        decode_schema(&bytes, &catalog).unwrap()
    }

    #[test]
    fn bare_scope_is_three_bytes() {
        let catalog = FieldCatalog::new();
        let bytes = encode_schema(&SearchSchema::new(Scope::Queues), &catalog).unwrap();
        assert_eq!(bytes, vec![SCHEMA_VERSION, 3, 0]);
    }

    #[test]
    fn default_terms_encode_without_overrides() {
        let catalog = FieldCatalog::new();
        let mut schema = SearchSchema::new(Scope::Items);
        schema.search_terms = Some(SearchTermsSchema::new(vec!["foo".into()]));
        let bytes = encode_schema(&schema, &catalog).unwrap();
        // header, 1 term, "foo", flags, multiplier masks, weight masks
        assert_eq!(
            bytes,
            vec![SCHEMA_VERSION, 1, HAS_TERMS, 1, 3, b'f', b'o', b'o', 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(decode_schema(&bytes, &catalog).unwrap(), schema);
    }

    #[test]
    fn overrides_and_nulls_survive() {
        let mut terms = SearchTermsSchema::new(vec!["a".into(), "long term".into()]);
        terms.case_sensitive = true;
        terms.pattern_multipliers.set(PatternKind::Suffix, None);
        terms.pattern_multipliers.set(PatternKind::Exact, Some(-7));
        terms.field_weights.set(ModelField::ItemSetTags, None);
        terms.field_weights.set(ModelField::QueueName, Some(127));
        let mut schema = SearchSchema::new(Scope::Queues);
        schema.search_terms = Some(terms);
        assert_eq!(round_trip(&schema), schema);
    }

    #[test]
    fn filters_and_sorting_survive() {
        let t = parse_timestamp("2021-07-04T10:00:00Z").unwrap();
        let mut schema = SearchSchema::new(Scope::Requests);
        schema.sorting = Some(SortingSchema {
            options: vec![
                SortingOption {
                    field: ModelField::RequestCreatedAt,
                    order: SortingOrder::Desc,
                },
                SortingOption {
                    field: ModelField::ItemSetTitle,
                    order: SortingOrder::Asc,
                },
            ],
        });
        schema.filters = Some(filters_of(vec![
            (
                ModelField::ItemDifficultyRating,
                Conditions {
                    gt: Some(ConditionValue::Float(4.5)),
                    lte: Some(ConditionValue::Float(7.25)),
                    ..Default::default()
                },
            ),
            (
                ModelField::RequestStatus,
                Conditions {
                    in_: Some(vec![
                        ConditionValue::Str("pending".into()),
                        ConditionValue::Str("accepted".into()),
                    ]),
                    not_regex: Some("^rej".into()),
                    ..Default::default()
                },
            ),
            (
                ModelField::QueueUpdatedAt,
                Conditions {
                    gte: Some(ConditionValue::Timestamp(t)),
                    ..Default::default()
                },
            ),
            (
                ModelField::ProfileCountryCode,
                Conditions {
                    is_null: Some(false),
                    neq: Some(ConditionValue::Str("XX".into())),
                    ..Default::default()
                },
            ),
        ]));
        assert_eq!(round_trip(&schema), schema);
    }

    // ── decode failures ──────────────────────────────────────────

    #[test]
    fn unknown_version_and_scope() {
        let catalog = FieldCatalog::new();
        assert!(matches!(
            decode_schema(&[9, 1, 0], &catalog),
            Err(CodecError::UnsupportedVersion { offset: 0, version: 9 })
        ));
        assert!(matches!(
            decode_schema(&[SCHEMA_VERSION, 77, 0], &catalog),
            Err(CodecError::UnknownScope { offset: 1, id: 77 })
        ));
    }

    #[test]
    fn unknown_presence_bits() {
        let catalog = FieldCatalog::new();
        assert!(matches!(
            decode_schema(&[SCHEMA_VERSION, 1, 0x80], &catalog),
            Err(CodecError::UnknownFlags { offset: 2, .. })
        ));
    }

    #[test]
    fn unknown_field_id() {
        let catalog = FieldCatalog::new();
        // filters present, item category, one field with id 0xffff
        let bytes = [SCHEMA_VERSION, 1, HAS_FILTERS, 0b10, 1, 0xff, 0xff];
        assert!(matches!(
            decode_schema(&bytes, &catalog),
            Err(CodecError::UnknownFieldId { offset: 5, id: 0xffff })
        ));
    }

    #[test]
    fn field_filed_under_wrong_category() {
        let catalog = FieldCatalog::new();
        let queue_name = catalog.id_for(ModelField::QueueName).to_be_bytes();
        let bytes = [
            SCHEMA_VERSION, 1, HAS_FILTERS, 0b10, 1, queue_name[0], queue_name[1], 0, 1, 1, 5,
        ];
        assert!(matches!(
            decode_schema(&bytes, &catalog),
            Err(CodecError::FieldCategoryMismatch { offset: 5, .. })
        ));
    }

    #[test]
    fn every_truncation_fails() {
        let catalog = FieldCatalog::new();
        let mut schema = SearchSchema::new(Scope::ItemSets);
        schema.search_terms = Some(SearchTermsSchema::new(vec!["abc".into()]));
        schema.filters = Some(filters_of(vec![(
            ModelField::ItemSetBpm,
            Conditions {
                in_: Some(vec![ConditionValue::Float(120.0), ConditionValue::Float(180.5)]),
                ..Default::default()
            },
        )]));
        let bytes = encode_schema(&schema, &catalog).unwrap();
        for cut in 0..bytes.len() {
            assert!(
                decode_schema(&bytes[..cut], &catalog).is_err(),
                "prefix of {cut} bytes decoded"
            );
        }
        let mut extended = bytes.clone();
        extended.push(0);
        assert!(matches!(
            decode_schema(&extended, &catalog),
            Err(CodecError::TrailingBytes { .. })
        ));
    }

    // ── generated schemas ────────────────────────────────────────

    mod generated {
        use chrono::DateTime;
        use proptest::collection::vec;
        use proptest::option;
        use proptest::prelude::*;
        use proptest::sample::{select, subsequence};

        use super::super::filters_of;
        use crate::catalog::{FieldCatalog, FieldType, ModelField, Scope, SearchableField, SEARCHABLE_FIELDS};
        use crate::codec::{decode_schema, decode_token, encode_schema, encode_token};
        use crate::model::{
            ConditionValue, Conditions, FieldWeights, ParseContext, PatternKind, PatternMultipliers,
            RawQuery, SearchSchema, SearchTermsSchema, SortingOption, SortingOrder, SortingSchema,
            StaticProbe,
        };

        const SAFE_PATTERNS: &[&str] = &["^Insane$", "hard|insane", "[0-9]+ stars", "(?:easy|normal) diff", "a.*b"];

        fn fields_in(scope: Scope) -> Vec<ModelField> {
            let catalog = FieldCatalog::new();
            ModelField::ALL
                .iter()
                .copied()
                .filter(|f| catalog.in_scope(scope, f.category()))
                .collect()
        }

        fn value_of(ty: FieldType) -> BoxedStrategy<ConditionValue> {
            match ty {
                FieldType::Integer => prop_oneof![any::<i64>(), -200i64..300]
                    .prop_map(ConditionValue::Int)
                    .boxed(),
                FieldType::Float => prop_oneof![
                    (-1.0e6f64..1.0e6).prop_map(ConditionValue::Float),
                    (-4096i32..4096).prop_map(|q| ConditionValue::Float(f64::from(q) / 8.0)),
                    (-1000i64..1000).prop_map(ConditionValue::Int),
                ]
                .boxed(),
                FieldType::Text => prop_oneof!["[a-z]{0,10}", "\\PC{0,12}"]
                    .prop_map(ConditionValue::Str)
                    .boxed(),
                FieldType::Boolean => any::<bool>().prop_map(ConditionValue::Bool).boxed(),
                FieldType::Timestamp => (-62_000_000_000_000i64..250_000_000_000_000)
                    .prop_map(|ms| {
                        ConditionValue::Timestamp(DateTime::from_timestamp_millis(ms).unwrap())
                    })
                    .boxed(),
            }
        }

        type Bound = Option<(ConditionValue, bool)>;

        /// Puts the smaller operand on the lower side; drops the upper bound
        /// when the two cannot form a non-empty range.
        fn order_bounds(lower: Bound, upper: Bound) -> (Bound, Bound) {
            match (lower, upper) {
                (Some((a, sa)), Some((b, sb))) => match a.compare(&b) {
                    Some(std::cmp::Ordering::Less) => (Some((a, sa)), Some((b, sb))),
                    Some(std::cmp::Ordering::Greater) => (Some((b, sb)), Some((a, sa))),
                    _ => (Some((a, sa)), None),
                },
                other => other,
            }
        }

        fn conditions_for(ty: FieldType) -> BoxedStrategy<Conditions> {
            let v = value_of(ty);
            let pattern = if ty == FieldType::Text {
                option::of(select(SAFE_PATTERNS).prop_map(str::to_string)).boxed()
            } else {
                Just(None).boxed()
            };
            (
                0u8..6,
                option::of(v.clone()),
                option::of(v.clone()),
                option::of((v.clone(), any::<bool>())),
                option::of((v.clone(), any::<bool>())),
                option::of(vec(v.clone(), 1..4)),
                option::of(vec(v, 1..4)),
                any::<bool>(),
                pattern.clone(),
                pattern,
            )
                .prop_map(
                    |(shape, eq, neq, lower, upper, mut in_, mut not_in, not_null, regex, not_regex)| {
                        if shape == 0 {
                            return Conditions {
                                is_null: Some(true),
                                ..Default::default()
                            };
                        }
                        let neq = neq.filter(|n| eq.as_ref().map_or(true, |e| !e.same_value(n)));
                        if let (Some(e), Some(values)) = (&eq, &mut in_) {
                            if !values.iter().any(|v| v.same_value(e)) {
                                values.push(e.clone());
                            }
                        }
                        if let (Some(e), Some(values)) = (&eq, &mut not_in) {
                            values.retain(|v| !v.same_value(e));
                        }
                        let not_in = not_in.filter(|values| !values.is_empty());
                        let (lower, upper) = order_bounds(lower, upper);
                        let (gt, gte) = match lower {
                            Some((v, true)) => (Some(v), None),
                            Some((v, false)) => (None, Some(v)),
                            None => (None, None),
                        };
                        let (lt, lte) = match upper {
                            Some((v, true)) => (Some(v), None),
                            Some((v, false)) => (None, Some(v)),
                            None => (None, None),
                        };
                        let mut c = Conditions {
                            eq,
                            neq,
                            lt,
                            lte,
                            gt,
                            gte,
                            in_,
                            not_in,
                            is_null: not_null.then_some(false),
                            regex,
                            not_regex,
                        };
                        if c.operators().next().is_none() {
                            c.is_null = Some(false);
                        }
                        c
                    },
                )
                .boxed()
        }

        fn term() -> impl Strategy<Value = String> {
            prop_oneof!["[a-z0-9]{1,12}", "[a-z]{1,6} [a-z]{1,6}", "\\PC{1,16}"]
                .prop_filter("blank term", |t| !t.trim().is_empty())
        }

        fn terms_in(scope: Scope) -> impl Strategy<Value = SearchTermsSchema> {
            let catalog = FieldCatalog::new();
            let searchable: Vec<SearchableField> = SEARCHABLE_FIELDS
                .iter()
                .copied()
                .filter(|s| catalog.in_scope(scope, s.field.category()))
                .collect();
            let multiplier = || option::of(any::<i8>());
            (
                vec(term(), 1..4),
                any::<bool>(),
                (multiplier(), multiplier(), multiplier(), multiplier()),
                // outer None keeps the default weight
                vec(option::of(option::of(any::<i8>())), searchable.len()),
            )
                .prop_map(move |(terms, case_sensitive, (exact, prefix, suffix, substring), picks)| {
                    let mut pattern_multipliers = PatternMultipliers {
                        exact,
                        prefix,
                        suffix,
                        substring,
                    };
                    if pattern_multipliers.enabled().next().is_none() {
                        pattern_multipliers
                            .set(PatternKind::Exact, Some(PatternKind::Exact.default_multiplier()));
                    }
                    let mut field_weights = FieldWeights::default();
                    for (s, pick) in searchable.iter().zip(picks) {
                        if let Some(weight) = pick {
                            field_weights.set(s.field, weight);
                        }
                    }
                    if searchable.iter().all(|s| field_weights.get(s.field).is_none()) {
                        let first = searchable[0];
                        field_weights.set(first.field, Some(first.default_weight));
                    }
                    SearchTermsSchema {
                        terms,
                        case_sensitive,
                        pattern_multipliers,
                        field_weights,
                    }
                })
        }

        fn sorting_in(scope: Scope) -> impl Strategy<Value = SortingSchema> {
            subsequence(fields_in(scope), 0..=4)
                .prop_shuffle()
                .prop_flat_map(|fields| {
                    let n = fields.len();
                    (Just(fields), vec(any::<bool>(), n))
                })
                .prop_map(|(fields, desc)| SortingSchema {
                    options: fields
                        .into_iter()
                        .zip(desc)
                        .map(|(field, desc)| SortingOption {
                            field,
                            order: if desc { SortingOrder::Desc } else { SortingOrder::Asc },
                        })
                        .collect(),
                })
        }

        fn filters_in(scope: Scope) -> impl Strategy<Value = crate::model::FiltersSchema> {
            subsequence(fields_in(scope), 0..=5)
                .prop_flat_map(|fields| {
                    fields
                        .into_iter()
                        .map(|field| conditions_for(field.field_type()).prop_map(move |c| (field, c)))
                        .collect::<Vec<_>>()
                })
                .prop_map(filters_of)
        }

        fn search_schema() -> impl Strategy<Value = SearchSchema> {
            select(Scope::ALL.to_vec())
                .prop_flat_map(|scope| {
                    (
                        Just(scope),
                        option::of(terms_in(scope)),
                        option::of(sorting_in(scope)),
                        option::of(filters_in(scope)),
                    )
                })
                .prop_map(|(scope, search_terms, sorting, filters)| SearchSchema {
                    scope,
                    search_terms,
                    sorting,
                    filters,
                })
        }

        proptest! {
            #[test]
            fn every_valid_schema_round_trips(schema in search_schema()) {
                let catalog = FieldCatalog::new();
                let ctx = ParseContext::new(&catalog, &StaticProbe);
                let validated = schema.validate(ctx);
                prop_assert!(validated.is_ok(), "generated an invalid schema: {:?}", validated);

                let bytes = encode_schema(&schema, &catalog).unwrap();
                prop_assert_eq!(&decode_schema(&bytes, &catalog).unwrap(), &schema);

                let token = encode_token(&schema, &catalog).unwrap();
                prop_assert_eq!(&decode_token(&token, &catalog).unwrap(), &schema);
                let parsed = SearchSchema::parse(&RawQuery::Token(token), ctx).unwrap();
                prop_assert_eq!(&parsed, &schema);
            }
        }
    }
}
