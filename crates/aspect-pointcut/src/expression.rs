// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt, str::FromStr};

use aspect_model::annotation::{AnnotationKind, AnnotationRef};
use wildmatch::WildMatch;

use crate::PointcutError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointcutType {
    Class,
    Method,
    GetProperty,
    SetProperty,
    Parameter,
    Any,
}

impl PointcutType {
    /// Whether advices of this type apply to elements of type `element`.
    pub fn accepts(self, element: PointcutType) -> bool {
        self == PointcutType::Any || self == element
    }

    /// Annotation kind of the elements this type selects (`None` for `any`).
    pub fn annotation_kind(self) -> Option<AnnotationKind> {
        match self {
            PointcutType::Class => Some(AnnotationKind::Class),
            PointcutType::Method => Some(AnnotationKind::Method),
            PointcutType::GetProperty | PointcutType::SetProperty => {
                Some(AnnotationKind::Property)
            }
            PointcutType::Parameter => Some(AnnotationKind::Parameter),
            PointcutType::Any => None,
        }
    }
}

impl fmt::Display for PointcutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PointcutType::Class => "class",
            PointcutType::Method => "method",
            PointcutType::GetProperty => "get property",
            PointcutType::SetProperty => "set property",
            PointcutType::Parameter => "parameter",
            PointcutType::Any => "any",
        };
        f.write_str(name)
    }
}

/// A parsed pointcut expression.
///
/// Its `Display` form is canonical: it is what the advice registry keys on, so two expressions
/// written differently (extra spaces, `property` instead of `get property`, a repeated annotation)
/// end up under the same key.
#[derive(Clone, Debug)]
pub struct PointcutExpression {
    pointcut_type: PointcutType,
    annotations: Vec<AnnotationRef>,
    name: String,
    name_matcher: WildMatch,
}

impl PointcutExpression {
    pub fn new(
        pointcut_type: PointcutType,
        annotations: impl IntoIterator<Item = AnnotationRef>,
        name: impl Into<String>,
    ) -> Self {
        let mut unique: Vec<AnnotationRef> = vec![];
        for annotation in annotations {
            if !unique.contains(&annotation) {
                unique.push(annotation);
            }
        }

        let name = name.into();
        PointcutExpression {
            pointcut_type,
            annotations: unique,
            name_matcher: WildMatch::new(&name),
            name,
        }
    }

    pub fn pointcut_type(&self) -> PointcutType {
        self.pointcut_type
    }

    /// Annotations the expression selects on; empty selects every element of its type.
    pub fn annotations(&self) -> &[AnnotationRef] {
        &self.annotations
    }

    pub fn name_pattern(&self) -> &str {
        &self.name
    }

    /// Whether an element of type `element`, named `name` and carrying `annotations` is selected.
    pub fn matches<'a>(
        &self,
        element: PointcutType,
        name: &str,
        annotations: impl IntoIterator<Item = &'a AnnotationRef>,
    ) -> bool {
        if !self.pointcut_type.accepts(element) || !self.name_matcher.matches(name) {
            return false;
        }

        if self.annotations.is_empty() {
            return true;
        }

        annotations
            .into_iter()
            .any(|annotation| self.annotations.contains(annotation))
    }
}

impl PartialEq for PointcutExpression {
    fn eq(&self, other: &Self) -> bool {
        self.pointcut_type == other.pointcut_type
            && self.annotations == other.annotations
            && self.name == other.name
    }
}

impl Eq for PointcutExpression {}

impl fmt::Display for PointcutExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, annotation) in self.annotations.iter().enumerate() {
            if index > 0 {
                f.write_str("|")?;
            }
            write!(f, "{annotation}")?;
        }
        if !self.annotations.is_empty() {
            f.write_str(" ")?;
        }
        write!(f, "{} {}", self.pointcut_type, self.name)
    }
}

impl FromStr for PointcutExpression {
    type Err = PointcutError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let mut tokens = expression.split_whitespace().peekable();

        // `@a:X|@b:Y`, possibly with spaces around the separators
        let mut annotation_part = String::new();
        while let Some(token) = tokens.next_if(|token| token.starts_with('@') || token.starts_with('|')) {
            annotation_part.push_str(token);
        }

        let annotations = annotation_part
            .split('|')
            .filter(|part| !part.is_empty())
            .map(str::parse::<AnnotationRef>)
            .collect::<Result<Vec<_>, _>>()?;

        let pointcut_type = match tokens.next() {
            None => return Err(PointcutError::Empty),
            Some("class") => PointcutType::Class,
            Some("method") => PointcutType::Method,
            Some("property") => PointcutType::GetProperty,
            Some("parameter") => PointcutType::Parameter,
            Some("any") => PointcutType::Any,
            Some(accessor @ ("get" | "set")) => match tokens.next() {
                Some("property") if accessor == "get" => PointcutType::GetProperty,
                Some("property") => PointcutType::SetProperty,
                other => {
                    return Err(PointcutError::UnknownType(format!(
                        "{accessor} {}",
                        other.unwrap_or_default()
                    )));
                }
            },
            Some(other) => return Err(PointcutError::UnknownType(other.to_string())),
        };

        let name = tokens.next().unwrap_or("*");

        if let Some(token) = tokens.next() {
            return Err(PointcutError::TrailingInput {
                token: token.to_string(),
                expression: expression.to_string(),
            });
        }

        Ok(PointcutExpression::new(pointcut_type, annotations, name))
    }
}
