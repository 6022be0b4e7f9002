// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt, str::FromStr, sync::Arc};

use parking_lot::Mutex;

use crate::{
    error::{AspectError, WeavingError},
    mapped_arena::MappedArena,
    target::AnnotationTarget,
    value::Value,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Class,
    Method,
    Property,
    Parameter,
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnotationKind::Class => "class",
            AnnotationKind::Method => "method",
            AnnotationKind::Property => "property",
            AnnotationKind::Parameter => "parameter",
        };
        f.write_str(name)
    }
}

/// Identity of an annotation: `(group id, name)`, written `@group:name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationRef {
    group_id: String,
    name: String,
}

impl AnnotationRef {
    pub fn new(group_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            name: name.into(),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for AnnotationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group_id.is_empty() {
            write!(f, "@{}", self.name)
        } else {
            write!(f, "@{}:{}", self.group_id, self.name)
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid annotation reference `{0}`, expected `@group:Name` or `@Name`")]
pub struct InvalidAnnotationRef(pub String);

impl FromStr for AnnotationRef {
    type Err = InvalidAnnotationRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidAnnotationRef(s.to_string());
        let body = s.trim().strip_prefix('@').ok_or_else(invalid)?;

        let (group_id, name) = match body.split_once(':') {
            Some((group_id, name)) => (group_id, name),
            None => ("", body),
        };

        let valid_identifier = |part: &str| {
            part.chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '$'))
        };

        if name.is_empty() || !valid_identifier(name) || !valid_identifier(group_id) {
            return Err(invalid());
        }

        Ok(AnnotationRef::new(group_id, name))
    }
}

/// Validation hook of an annotation, run against every application at decoration time.
pub type AnnotationStub =
    Arc<dyn Fn(&AnnotationTarget, &[Value]) -> Result<(), AspectError> + Send + Sync>;

/// An annotation declaration. Cheap to clone; immutable once created.
#[derive(Clone)]
pub struct Annotation(Arc<AnnotationInner>);

struct AnnotationInner {
    reference: AnnotationRef,
    kind: AnnotationKind,
    stub: Option<AnnotationStub>,
}

impl Annotation {
    pub fn reference(&self) -> &AnnotationRef {
        &self.0.reference
    }

    pub fn kind(&self) -> AnnotationKind {
        self.0.kind
    }

    pub fn name(&self) -> &str {
        self.0.reference.name()
    }

    pub fn group_id(&self) -> &str {
        self.0.reference.group_id()
    }

    pub fn stub(&self) -> Option<&AnnotationStub> {
        self.0.stub.as_ref()
    }

    /// An application of this annotation with the given arguments.
    pub fn with(&self, args: impl IntoIterator<Item = impl Into<Value>>) -> AnnotationApplication {
        AnnotationApplication {
            annotation: self.clone(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// An application of this annotation without arguments.
    pub fn bare(&self) -> AnnotationApplication {
        AnnotationApplication {
            annotation: self.clone(),
            args: vec![],
        }
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0.reference, self.0.kind)
    }
}

impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        self.0.reference == other.0.reference
    }
}

/// An annotation together with the arguments it is applied with, not yet bound to a target.
#[derive(Clone, Debug)]
pub struct AnnotationApplication {
    pub annotation: Annotation,
    pub args: Vec<Value>,
}

/// One concrete application of an annotation to a target.
#[derive(Debug)]
pub struct AnnotationContext {
    pub annotation: Annotation,
    pub target: Arc<AnnotationTarget>,
    pub args: Vec<Value>,
}

impl AnnotationContext {
    pub fn reference(&self) -> &AnnotationRef {
        self.annotation.reference()
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }
}

/// Every annotation declared in one weaving context, so that a `(group, name)` pair always maps
/// to a single declaration.
#[derive(Default)]
pub struct AnnotationCatalog {
    annotations: Mutex<MappedArena<Annotation>>,
}

impl AnnotationCatalog {
    pub fn factory(self: &Arc<Self>, group_id: impl Into<String>) -> AnnotationFactory {
        AnnotationFactory {
            group_id: group_id.into(),
            catalog: self.clone(),
        }
    }

    pub fn get(&self, reference: &AnnotationRef) -> Option<Annotation> {
        self.annotations
            .lock()
            .get_by_key(&reference.to_string())
            .cloned()
    }

    fn declare(
        &self,
        reference: AnnotationRef,
        kind: AnnotationKind,
        stub: Option<AnnotationStub>,
    ) -> Result<Annotation, WeavingError> {
        let key = reference.to_string();
        let mut annotations = self.annotations.lock();

        if let Some(existing) = annotations.get_by_key(&key) {
            return if existing.kind() == kind {
                Ok(existing.clone())
            } else {
                Err(WeavingError::AnnotationKindConflict {
                    annotation: reference,
                    existing: existing.kind(),
                })
            };
        }

        let annotation = Annotation(Arc::new(AnnotationInner {
            reference,
            kind,
            stub,
        }));
        annotations.add(&key, annotation.clone());
        Ok(annotation)
    }
}

/// Creates the annotations of one group.
#[derive(Clone)]
pub struct AnnotationFactory {
    group_id: String,
    catalog: Arc<AnnotationCatalog>,
}

impl AnnotationFactory {
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn create(
        &self,
        kind: AnnotationKind,
        name: impl Into<String>,
    ) -> Result<Annotation, WeavingError> {
        self.catalog
            .declare(AnnotationRef::new(&self.group_id, name), kind, None)
    }

    pub fn create_with_stub(
        &self,
        kind: AnnotationKind,
        name: impl Into<String>,
        stub: impl Fn(&AnnotationTarget, &[Value]) -> Result<(), AspectError> + Send + Sync + 'static,
    ) -> Result<Annotation, WeavingError> {
        self.catalog.declare(
            AnnotationRef::new(&self.group_id, name),
            kind,
            Some(Arc::new(stub)),
        )
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn reference_parsing() {
        let qualified: AnnotationRef = "@demo:Log".parse().unwrap();
        assert_eq!(qualified, AnnotationRef::new("demo", "Log"));
        assert_eq!(qualified.to_string(), "@demo:Log");

        let bare: AnnotationRef = "@Log".parse().unwrap();
        assert_eq!(bare.group_id(), "");
        assert_eq!(bare.to_string(), "@Log");

        assert!("demo:Log".parse::<AnnotationRef>().is_err());
        assert!("@demo:".parse::<AnnotationRef>().is_err());
        assert!("@de mo:Log".parse::<AnnotationRef>().is_err());
    }

    #[test]
    fn declarations_are_unique_per_reference() {
        let catalog = Arc::new(AnnotationCatalog::default());
        let factory = catalog.factory("demo");

        let log = factory.create(AnnotationKind::Method, "Log").unwrap();
        let again = catalog
            .factory("demo")
            .create(AnnotationKind::Method, "Log")
            .unwrap();
        assert_eq!(log, again);

        let conflict = factory.create(AnnotationKind::Class, "Log");
        assert!(matches!(
            conflict,
            Err(WeavingError::AnnotationKindConflict {
                existing: AnnotationKind::Method,
                ..
            })
        ));

        assert!(catalog.get(&AnnotationRef::new("demo", "Log")).is_some());
        assert!(catalog.get(&AnnotationRef::new("other", "Log")).is_none());
    }
}
