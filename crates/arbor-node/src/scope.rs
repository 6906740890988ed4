//! Disclosure scope carried by every content node.

use crate::selector::Selector;

/// What a node wants from its own subtree when it is (re)materialized.
///
/// A stub is complete exactly when its scope is [`Scope::Unwanted`]: it
/// carries no obligation to be fetched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Scope {
    /// The whole subtree is wanted.
    #[default]
    Full,
    /// The node itself is wanted; its children only as routed by the
    /// selectors once its body is known.
    Selected { targets: Selector, masks: Selector },
    /// Nothing is wanted here.
    Unwanted,
}

impl Scope {
    pub fn is_wanted(&self) -> bool {
        !matches!(self, Scope::Unwanted)
    }

    /// Narrow to (or extend by) a target set.
    pub(crate) fn with_targets(&self, targets: &Selector) -> Scope {
        match self {
            Scope::Selected { targets: current, masks } => {
                let mut merged = current.clone();
                merged.union(targets);
                Scope::Selected {
                    targets: merged,
                    masks: masks.clone(),
                }
            }
            Scope::Full | Scope::Unwanted => Scope::Selected {
                targets: targets.clone(),
                masks: Selector::new(),
            },
        }
    }

    /// Narrow to (or extend by) a mask set.
    pub(crate) fn with_masks(&self, masks: &Selector) -> Scope {
        match self {
            Scope::Selected { targets, masks: current } => {
                let mut merged = current.clone();
                merged.union(masks);
                Scope::Selected {
                    targets: targets.clone(),
                    masks: merged,
                }
            }
            Scope::Full | Scope::Unwanted => Scope::Selected {
                targets: Selector::new(),
                masks: masks.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(path: &[&str]) -> Selector {
        Selector::from_paths([path.iter().map(|s| s.to_string()).collect()])
    }

    #[test]
    fn targeting_narrows_full() {
        let scope = Scope::Full.with_targets(&sel(&["a"]));
        assert_eq!(
            scope,
            Scope::Selected {
                targets: sel(&["a"]),
                masks: Selector::new()
            }
        );
    }

    #[test]
    fn selections_accumulate() {
        let scope = Scope::Unwanted
            .with_targets(&sel(&["a"]))
            .with_targets(&sel(&["b"]))
            .with_masks(&sel(&["c"]));
        let Scope::Selected { targets, masks } = scope else {
            panic!("expected a selected scope");
        };
        assert!(targets.contains(&["a".to_string()]));
        assert!(targets.contains(&["b".to_string()]));
        assert!(masks.contains(&["c".to_string()]));
    }

    #[test]
    fn only_unwanted_is_unwanted() {
        assert!(Scope::Full.is_wanted());
        assert!(Scope::Full.with_masks(&sel(&["x"])).is_wanted());
        assert!(!Scope::Unwanted.is_wanted());
    }
}
