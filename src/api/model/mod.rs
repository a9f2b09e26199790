//! GraphQL representation of the objects in the store.

pub(crate) mod author;
pub(crate) mod book;


/// Parses a client-supplied `ID` into a store key.
///
/// Surrounding whitespace is ignored and integral numbers in float notation
/// (`"1.0"`, `"1e0"`) are accepted. Anything else cannot refer to an object in
/// the store and is treated like an unknown ID.
fn parse_id(id: &juniper::ID) -> Option<i32> {
    let s = id.trim();
    if let Ok(key) = s.parse::<i32>() {
        return Some(key);
    }

    let float = s.parse::<f64>().ok()?;
    let in_range = float >= f64::from(i32::MIN) && float <= f64::from(i32::MAX);
    (float.is_finite() && float.fract() == 0.0 && in_range).then(|| float as i32)
}
