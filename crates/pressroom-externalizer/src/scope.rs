//! Content scope for merger visits
//!
//! Exactly one "current content" value is visible while a node is visited.
//! Entering pushes the node's bytes and returns a guard; dropping the guard
//! restores the previous content on every exit path, including `?` returns
//! and panics. Scopes nest, and a scope belongs to a single tree's walk: it
//! is neither `Send` nor `Sync`.

use crate::ExternalizationError;
use std::cell::RefCell;
use std::rc::Rc;

/// Stack of node contents, one entry per active visit
#[derive(Debug, Default)]
pub struct ContentScope {
    stack: RefCell<Vec<Rc<[u8]>>>,
}

impl ContentScope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `content` current until the returned guard is dropped
    #[must_use = "content leaves scope as soon as the guard is dropped"]
    pub fn enter(&self, content: Vec<u8>) -> ScopeGuard<'_> {
        let mut stack = self.stack.borrow_mut();
        let depth = stack.len();
        stack.push(Rc::from(content));
        ScopeGuard { scope: self, depth }
    }

    /// Run `f` with the current content
    ///
    /// The scope is not borrowed while `f` runs, so `f` may enter nested
    /// scopes.
    pub fn with_current<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, ExternalizationError> {
        let current = self
            .stack
            .borrow()
            .last()
            .cloned()
            .ok_or(ExternalizationError::NoContentInScope)?;
        Ok(f(&current))
    }

    /// Number of nested visits currently active
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

/// Keeps one content entry in scope; exits on drop
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    scope: &'a ContentScope,
    depth: usize,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.scope.stack.borrow_mut().truncate(self.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scope_has_no_content() {
        let scope = ContentScope::new();
        assert_eq!(
            scope.with_current(|c| c.len()),
            Err(ExternalizationError::NoContentInScope)
        );
    }

    #[test]
    fn test_guard_restores_previous_content() {
        let scope = ContentScope::new();
        let _outer = scope.enter(b"outer".to_vec());
        {
            let _inner = scope.enter(b"inner".to_vec());
            assert_eq!(scope.with_current(|c| c.to_vec()).unwrap(), b"inner");
            assert_eq!(scope.depth(), 2);
        }
        assert_eq!(scope.with_current(|c| c.to_vec()).unwrap(), b"outer");
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn test_exit_on_error_path() {
        fn visit(scope: &ContentScope) -> Result<(), ExternalizationError> {
            let _guard = scope.enter(b"node".to_vec());
            Err(ExternalizationError::EmptyTree)
        }

        let scope = ContentScope::new();
        assert!(visit(&scope).is_err());
        assert_eq!(scope.depth(), 0);
    }

    #[test]
    fn test_nested_enter_inside_callback() {
        let scope = ContentScope::new();
        let _guard = scope.enter(b"a".to_vec());
        let seen = scope
            .with_current(|outer| {
                let _nested = scope.enter(b"b".to_vec());
                let inner = scope.with_current(|c| c.to_vec()).unwrap();
                (outer.to_vec(), inner)
            })
            .unwrap();
        assert_eq!(seen, (b"a".to_vec(), b"b".to_vec()));
    }
}
