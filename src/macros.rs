pub use enclose::*;

/// Declares a derivation on a scope, cloning the listed handles into it.
///
/// ```
/// use tether::{computed, ManualScheduler, Scope};
///
/// let scope = Scope::new(ManualScheduler::new());
/// let a = scope.state(2);
/// let double = computed!(scope, (a) _cx, _prev => a.read() * 2);
/// assert_eq!(double.read(), Some(4));
/// ```
#[macro_export]
macro_rules! computed {
    ($scope:expr, ( $($d_tt:tt)* ) $cx:ident, $prev:pat => $($b:tt)*) => {
        $scope.derive($crate::macros::enclose!(($( $d_tt )*) move |$cx: &$crate::Scope, $prev| { $($b)* }))
    };
    ($scope:expr, $cx:ident, $prev:pat => $($b:tt)*) => {
        $scope.derive(move |$cx: &$crate::Scope, $prev| { $($b)* })
    };
}

/// Connects a value to an external target. The listed handles are cloned
/// into both the liveness check and the apply body.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use tether::{bind, ManualScheduler, Scope};
///
/// let scope = Scope::new(ManualScheduler::new());
/// let title = scope.state(String::from("draft"));
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// bind!(scope, &title, (seen) { true }, current, _committed: String => {
/// 	seen.borrow_mut().push(current.clone());
/// });
/// assert_eq!(*seen.borrow(), ["draft"]);
/// ```
#[macro_export]
macro_rules! bind {
    ($scope:expr, $value:expr, ( $($d_tt:tt)* ) $alive:block, $current:ident, $committed:ident : $ty:ty => $($b:tt)*) => {
        $scope.connect($value, $crate::binding(
            $crate::macros::enclose!(($( $d_tt )*) move || $alive),
            $crate::macros::enclose!(($( $d_tt )*) move |$current: &$ty, $committed: &$ty| { $($b)* }),
        ))
    };
}
