//! Macros shared by configuration types.

/// Implements [`ConfigValidator`](crate::core::config::ConfigValidator) from a
/// list of per-field rules.
///
/// Supported rules are `range(min, max)` (inclusive) and `min(value)`.
///
/// ```rust,ignore
/// impl_config_validator!(RectangleDetectionConfig {
///     minimum_confidence: range(0.0, 1.0),
///     max_observations: min(1),
/// });
/// ```
#[macro_export]
macro_rules! impl_config_validator {
    ($ty:ty { $($field:ident : $rule:ident ( $($arg:expr),* )),* $(,)? }) => {
        impl $crate::core::config::ConfigValidator for $ty {
            fn validate(&self) -> Result<(), $crate::core::config::ConfigError> {
                $(
                    $crate::impl_config_validator!(@rule self, $field, $rule($($arg),*));
                )*
                Ok(())
            }
        }
    };
    (@rule $self:ident, $field:ident, range($min:expr, $max:expr)) => {
        $crate::core::config::validate_range(
            stringify!($field),
            $self.$field as f64,
            $min as f64,
            $max as f64,
        )?;
    };
    (@rule $self:ident, $field:ident, min($min:expr)) => {
        $crate::core::config::validate_min(stringify!($field), $self.$field as f64, $min as f64)?;
    };
}
