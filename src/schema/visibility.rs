//! Visibility tokens for entity, LOD and sub-asset prims.
//!
//! A prim is `inherited` (visible unless an ancestor hides it) while its
//! entity is enabled and, for LOD groups and sub-assets, while its variant
//! is the active one. Otherwise it is `invisible`.

use crate::core::Value;

/// Visibility field name.
pub const VISIBILITY_FIELD_NAME: &str = "visibility";

/// Prim visibility state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Visibility is inherited from the parent.
    #[default]
    Inherited,

    /// Prim is explicitly hidden.
    Invisible,
}

impl Visibility {
    /// Visible if `active`, hidden otherwise.
    pub fn from_active(active: bool) -> Self {
        if active {
            Self::Inherited
        } else {
            Self::Invisible
        }
    }

    /// Parse from token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "inherited" => Some(Self::Inherited),
            "invisible" => Some(Self::Invisible),
            _ => None,
        }
    }

    /// Token as exposed to hosts.
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Inherited => "inherited",
            Self::Invisible => "invisible",
        }
    }

    pub fn is_visible(self) -> bool {
        matches!(self, Self::Inherited)
    }
}

impl From<Visibility> for Value {
    fn from(vis: Visibility) -> Self {
        Value::token(vis.as_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_tokens() {
        assert_eq!(Visibility::from_active(true), Visibility::Inherited);
        assert_eq!(Visibility::from_active(false).as_token(), "invisible");
        assert_eq!(Visibility::from_token("inherited"), Some(Visibility::Inherited));
        assert_eq!(Visibility::from_token("hidden"), None);
        assert!(!Visibility::Invisible.is_visible());
    }

    #[test]
    fn test_into_value() {
        let v: Value = Visibility::Invisible.into();
        assert_eq!(v.as_token(), Some("invisible"));
    }
}
