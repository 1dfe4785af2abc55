use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

/// Decides whether a successfully fetched value may be stored.
///
/// A fetch that succeeds with an "empty" value (an empty body, `None`) is
/// returned to the caller but never cached, so the next call fetches again.
///
/// # Default Implementation
///
/// The default implementation accepts every value. Types with a meaningful
/// notion of emptiness override it.
///
/// # Examples
///
/// ```
/// use fetchcache_core::Cacheable;
///
/// #[derive(Clone)]
/// struct Page {
///     status: u16,
///     body: String,
/// }
///
/// impl Cacheable for Page {
///     fn is_cacheable(&self) -> bool {
///         self.status == 200 && !self.body.is_empty()
///     }
/// }
///
/// assert!(String::from("<html>").is_cacheable());
/// assert!(!String::new().is_cacheable());
/// assert!(!None::<String>.is_cacheable());
/// assert!(!Page { status: 404, body: "gone".into() }.is_cacheable());
/// ```
pub trait Cacheable {
    fn is_cacheable(&self) -> bool {
        true
    }
}

impl Cacheable for i8 {}
impl Cacheable for i16 {}
impl Cacheable for i32 {}
impl Cacheable for i64 {}
impl Cacheable for i128 {}
impl Cacheable for isize {}

impl Cacheable for u8 {}
impl Cacheable for u16 {}
impl Cacheable for u32 {}
impl Cacheable for u64 {}
impl Cacheable for u128 {}
impl Cacheable for usize {}

impl Cacheable for f32 {}
impl Cacheable for f64 {}

impl Cacheable for bool {}
impl Cacheable for char {}

impl Cacheable for String {
    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}

impl Cacheable for &str {
    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}

impl Cacheable for Cow<'_, str> {
    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Cacheable for Vec<T> {
    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, S> Cacheable for HashMap<K, V, S> {
    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V> Cacheable for BTreeMap<K, V> {
    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}

// `None` is the "no result" case; `Some` defers to the inner value.
impl<T: Cacheable> Cacheable for Option<T> {
    fn is_cacheable(&self) -> bool {
        self.as_ref().is_some_and(Cacheable::is_cacheable)
    }
}

impl<T: Cacheable + ?Sized> Cacheable for Box<T> {
    fn is_cacheable(&self) -> bool {
        (**self).is_cacheable()
    }
}

impl<T: Cacheable + ?Sized> Cacheable for Arc<T> {
    fn is_cacheable(&self) -> bool {
        (**self).is_cacheable()
    }
}

impl<T: Cacheable + ?Sized> Cacheable for Rc<T> {
    fn is_cacheable(&self) -> bool {
        (**self).is_cacheable()
    }
}

impl Cacheable for str {
    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Cacheable for [T] {
    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}
