use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Stable UTF-8 representation of a document key.
///
/// The index file only transports UTF-8 strings, so any key type must say how
/// it turns into one. The conversion has to be deterministic: the same key
/// must always produce the same string.
pub trait ToKeyString {
    fn to_key_string(&self) -> String;
}

impl ToKeyString for str {
    fn to_key_string(&self) -> String {
        self.to_owned()
    }
}

impl ToKeyString for String {
    fn to_key_string(&self) -> String {
        self.clone()
    }
}

impl ToKeyString for Box<str> {
    fn to_key_string(&self) -> String {
        self.to_string()
    }
}

impl ToKeyString for Cow<'_, str> {
    fn to_key_string(&self) -> String {
        self.to_string()
    }
}

impl ToKeyString for char {
    fn to_key_string(&self) -> String {
        self.to_string()
    }
}

// Non-UTF-8 components are replaced with U+FFFD, which is still deterministic.
impl ToKeyString for Path {
    fn to_key_string(&self) -> String {
        self.to_string_lossy().into_owned()
    }
}

impl ToKeyString for PathBuf {
    fn to_key_string(&self) -> String {
        self.as_path().to_key_string()
    }
}

impl<T: ToKeyString + ?Sized> ToKeyString for &T {
    fn to_key_string(&self) -> String {
        (**self).to_key_string()
    }
}

macro_rules! display_keys {
    ($($t:ty),*) => {
        $(impl ToKeyString for $t {
            fn to_key_string(&self) -> String {
                self.to_string()
            }
        })*
    };
}

display_keys!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
