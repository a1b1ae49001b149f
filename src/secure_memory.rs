//! Secure Memory Handling Utilities
//!
//! Containers and helpers that keep secret key bytes, derivation seeds and
//! signing randomness from lingering in memory after use.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A byte container for secret key material that is zeroed when dropped.
///
/// # Security Properties
///
/// 1. Automatically zeroes memory when dropped
/// 2. Every clone owns and wipes its own copy
/// 3. `Debug` prints only the length
///
/// # Example
///
/// ```
/// use qasa_dilithium::secure_memory::SecureBytes;
///
/// let key = SecureBytes::new(&[0x01, 0x02, 0x03, 0x04]);
/// assert_eq!(key.len(), 4);
/// // When `key` goes out of scope, memory is securely zeroed
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureBytes {
    bytes: Vec<u8>,
}

impl SecureBytes {
    /// Create a new SecureBytes holding a copy of `data`
    pub fn new(data: &[u8]) -> Self {
        Self {
            bytes: data.to_vec(),
        }
    }

    /// Get a reference to the underlying bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the container and return the contained bytes
    ///
    /// After calling this method it becomes the caller's responsibility to
    /// zeroize the returned vector.
    pub fn into_vec(mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureBytes({} bytes)", self.bytes.len())
    }
}

impl From<Vec<u8>> for SecureBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl AsRef<[u8]> for SecureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Run `f` on sensitive data and zeroize the data afterwards
///
/// The data is wiped when `f` returns, whether it returns normally, returns
/// early through `?`, or panics.
///
/// # Example
///
/// ```
/// use qasa_dilithium::secure_memory::with_secure_scope;
///
/// let mut seed = [7u8; 32];
/// let first = with_secure_scope(&mut seed, |s| s[0]);
/// assert_eq!(first, 7);
/// assert_eq!(seed, [0u8; 32]);
/// ```
pub fn with_secure_scope<T, F, R>(data: &mut T, f: F) -> R
where
    T: Zeroize,
    F: FnOnce(&mut T) -> R,
{
    struct ScopeGuard<'a, T: Zeroize> {
        data: &'a mut T,
    }

    impl<'a, T: Zeroize> Drop for ScopeGuard<'a, T> {
        fn drop(&mut self) {
            self.data.zeroize();
        }
    }

    let guard = ScopeGuard { data };
    f(&mut *guard.data)
}
