use std::any::TypeId;

/// Opaque identifier of a stage, derived from its label type.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Id(TypeId);

impl Id {
    /// Construct a new ID from a label type.
    #[inline]
    pub fn new<L: Label>() -> Self {
        Self(TypeId::of::<L>())
    }
}

/// A marker trait for stage identifiers.
///
/// Stage labels are zero-sized types, usually declared with [`define_stage!`]:
///
/// ```
/// morph_engine::define_stage!(Update, Render);
/// ```
///
/// or by hand:
///
/// ```
/// use morph_engine::ecs::schedule::{Id, Label};
///
/// struct Physics;
///
/// impl Label for Physics {
///     fn name() -> &'static str { "Physics" }
///     fn id(self) -> Id { Id::new::<Self>() }
/// }
/// ```
pub trait Label: 'static {
    /// Returns a human-readable name for this stage, used in logs, errors and `Display`.
    fn name() -> &'static str;

    /// Get the stage ID for a label.
    fn id(self) -> Id;
}

/// Defines one or more stage label types.
///
/// For each identifier this generates a unit struct implementing
/// [`Label`](crate::ecs::schedule::Label) whose name is the identifier itself.
#[macro_export]
macro_rules! define_stage {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            pub struct $name;

            impl $crate::ecs::schedule::Label for $name {
                #[inline]
                fn name() -> &'static str {
                    stringify!($name)
                }

                fn id(self) -> $crate::ecs::schedule::Id {
                    $crate::ecs::schedule::Id::new::<Self>()
                }
            }
        )*
    };
}
