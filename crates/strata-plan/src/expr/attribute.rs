//! Attributes and identity-keyed attribute collections.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use strata_core::{DataType, ExprId};

/// A named, typed column reference.
///
/// Two attributes refer to the same column slot iff their [`ExprId`]s match.
/// The name, qualifier and metadata are display and lookup aids only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    /// Column name.
    pub name: String,
    /// Column type.
    pub data_type: DataType,
    /// Whether the column may contain NULL.
    pub nullable: bool,
    /// Identity of the column slot.
    pub expr_id: ExprId,
    /// Table or alias lineage, outermost first.
    pub qualifier: Vec<String>,
    /// Free-form column metadata.
    pub metadata: BTreeMap<String, String>,
}

impl Attribute {
    /// Creates a nullable attribute with a fresh identity.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            expr_id: ExprId::next(),
            qualifier: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Creates a non-nullable attribute with a fresh identity.
    #[must_use]
    pub fn not_null(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type).with_nullability(false)
    }

    /// Returns a copy with the given nullability.
    #[must_use]
    pub fn with_nullability(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Returns a copy with the given qualifier.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: Vec<String>) -> Self {
        self.qualifier = qualifier;
        self
    }

    /// Returns a copy with the given identity.
    #[must_use]
    pub fn with_expr_id(mut self, expr_id: ExprId) -> Self {
        self.expr_id = expr_id;
        self
    }

    /// Returns a copy with the given name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns a copy with the given data type.
    #[must_use]
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Returns a copy with one metadata entry added.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a copy with a fresh identity.
    #[must_use]
    pub fn new_instance(&self) -> Self {
        self.clone().with_expr_id(ExprId::next())
    }

    /// Returns true if both attributes refer to the same column slot.
    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        self.expr_id == other.expr_id
    }

    /// The attribute with everything but identity and type erased.
    #[must_use]
    pub fn canonicalized(&self) -> Self {
        Self {
            name: "none".to_owned(),
            data_type: self.data_type.clone(),
            nullable: true,
            expr_id: self.expr_id,
            qualifier: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.expr_id)
    }
}

/// An insertion-ordered set of attributes keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    attrs: Vec<Attribute>,
    ids: HashSet<ExprId>,
}

impl AttributeSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute; returns false if its identity was already present.
    pub fn insert(&mut self, attr: Attribute) -> bool {
        if self.ids.insert(attr.expr_id) {
            self.attrs.push(attr);
            true
        } else {
            false
        }
    }

    /// Returns true if an attribute with the same identity is present.
    #[must_use]
    pub fn contains(&self, attr: &Attribute) -> bool {
        self.ids.contains(&attr.expr_id)
    }

    /// Returns true if the identity is present.
    #[must_use]
    pub fn contains_id(&self, id: ExprId) -> bool {
        self.ids.contains(&id)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.iter()
    }

    /// The first attribute inserted, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Attribute> {
        self.attrs.first()
    }

    /// Returns true if every attribute here is also in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.attrs.iter().all(|a| other.contains(a))
    }

    /// Attributes present in both sets, in this set's order.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        self.attrs.iter().filter(|a| other.contains(a)).cloned().collect()
    }

    /// Attributes present here but not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.attrs.iter().filter(|a| !other.contains(a)).cloned().collect()
    }

    /// All attributes of both sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.extend(other.attrs.iter().cloned());
        out
    }

    /// The identities in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ExprId> + '_ {
        self.attrs.iter().map(|a| a.expr_id)
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl Extend<Attribute> for AttributeSet {
    fn extend<I: IntoIterator<Item = Attribute>>(&mut self, iter: I) {
        for attr in iter {
            self.insert(attr);
        }
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a> FromIterator<&'a Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = &'a Attribute>>(iter: I) -> Self {
        iter.into_iter().cloned().collect()
    }
}

impl IntoIterator for AttributeSet {
    type Item = Attribute;
    type IntoIter = std::vec::IntoIter<Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.into_iter()
    }
}

/// A map keyed by attribute identity.
#[derive(Debug, Clone, Default)]
pub struct AttributeMap<V> {
    entries: HashMap<ExprId, V>,
}

impl<V> AttributeMap<V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Inserts a value for the attribute's identity.
    pub fn insert(&mut self, attr: &Attribute, value: V) -> Option<V> {
        self.entries.insert(attr.expr_id, value)
    }

    /// Looks up the value for the attribute's identity.
    #[must_use]
    pub fn get(&self, attr: &Attribute) -> Option<&V> {
        self.entries.get(&attr.expr_id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a, V> FromIterator<(&'a Attribute, V)> for AttributeMap<V> {
    fn from_iter<I: IntoIterator<Item = (&'a Attribute, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (attr, value) in iter {
            map.insert(attr, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_not_name_decides_membership() {
        let a = Attribute::new("a", DataType::Long);
        let renamed = a.clone().with_name("b").with_qualifier(vec!["t".into()]);
        let other = Attribute::new("a", DataType::Long);

        let set: AttributeSet = [a.clone()].into_iter().collect();
        assert!(set.contains(&renamed));
        assert!(!set.contains(&other));
        assert!(a.semantic_eq(&renamed));
    }

    #[test]
    fn set_keeps_insertion_order_and_dedups() {
        let a = Attribute::new("a", DataType::Long);
        let b = Attribute::new("b", DataType::Long);
        let mut set = AttributeSet::new();
        assert!(set.insert(b.clone()));
        assert!(set.insert(a.clone()));
        assert!(!set.insert(b.clone()));
        let names: Vec<_> = set.iter().map(|x| x.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn set_algebra() {
        let a = Attribute::new("a", DataType::Long);
        let b = Attribute::new("b", DataType::Long);
        let c = Attribute::new("c", DataType::Long);
        let ab: AttributeSet = [&a, &b].into_iter().collect();
        let bc: AttributeSet = [&b, &c].into_iter().collect();

        assert_eq!(ab.intersect(&bc).len(), 1);
        assert!(ab.intersect(&bc).contains(&b));
        assert!(ab.difference(&bc).contains(&a));
        assert_eq!(ab.union(&bc).len(), 3);
        assert!(ab.intersect(&bc).is_subset_of(&ab));
        assert!(!ab.is_subset_of(&bc));
    }

    #[test]
    fn new_instance_changes_only_identity() {
        let a = Attribute::not_null("a", DataType::Integer);
        let b = a.new_instance();
        assert_ne!(a.expr_id, b.expr_id);
        assert_eq!(a.name, b.name);
        assert!(!b.nullable);
    }

    #[test]
    fn canonicalized_erases_cosmetics() {
        let a = Attribute::not_null("a", DataType::Integer)
            .with_qualifier(vec!["t".into()])
            .with_metadata("comment", "x");
        let c = a.canonicalized();
        assert_eq!(c.name, "none");
        assert!(c.qualifier.is_empty());
        assert!(c.metadata.is_empty());
        assert!(c.nullable);
        assert_eq!(c.expr_id, a.expr_id);
    }

    #[test]
    fn attribute_map_lookup_by_identity() {
        let a = Attribute::new("a", DataType::Long);
        let b = Attribute::new("b", DataType::Long);
        let map: AttributeMap<usize> = [(&a, 0), (&b, 1)].into_iter().collect();
        assert_eq!(map.get(&a.clone().with_name("renamed")), Some(&0));
        assert_eq!(map.get(&b), Some(&1));
        assert_eq!(map.len(), 2);
    }
}
