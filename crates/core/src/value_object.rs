/// Marker for values compared by their attributes rather than an identity,
/// such as a document number.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
