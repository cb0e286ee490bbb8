use crate::VectorDocument;

/// A pure test of one entity against its document.
pub type Predicate<E> = Box<dyn Fn(&E, &VectorDocument) -> bool + Send + Sync>;

/// Predicates combined with logical AND, evaluated in order with short-circuiting.
pub struct FilterGroup<E> {
    predicates: Vec<Predicate<E>>,
}

impl<E> FilterGroup<E> {
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Append one predicate to the group.
    pub fn with<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E, &VectorDocument) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Box::new(predicate));
        self
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, entity: &E, doc: &VectorDocument) -> bool {
        self.predicates.iter().all(|p| p(entity, doc))
    }
}

impl<E> Default for FilterGroup<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter groups combined with logical OR.
///
/// An entity is retained when it satisfies every predicate of at least one
/// group, or when no group was ever registered.
pub struct FilterComposer<E> {
    groups: Vec<FilterGroup<E>>,
}

impl<E> FilterComposer<E> {
    pub fn add_group(&mut self, group: FilterGroup<E>) {
        self.groups.push(group);
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn retains(&self, entity: &E, doc: &VectorDocument) -> bool {
        self.groups.is_empty() || self.groups.iter().any(|g| g.matches(entity, doc))
    }
}

impl<E> Default for FilterComposer<E> {
    fn default() -> Self {
        Self { groups: Vec::new() }
    }
}
