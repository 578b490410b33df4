//! Params - メソッド引数リストの静的表現
//!
//! 引数リストはタプル型で表す。`(i32, f32)` は `Fn(&T, i32, f32)` に対応し、
//! `Method::call` がタプルを位置ごとに分解してメソッドへ move する。
//!
//! # 対応 arity
//! 0 〜 8 引数

/// A method argument list, expressed as a tuple type.
///
/// ```ignore
/// struct Counter { /* ... */ }
/// impl Counter {
///     fn add(&self, by: i32) { /* ... */ }
/// }
///
/// // `(i32,)` selects methods shaped like `fn(&Counter, i32)`
/// let d = bind::<_, (i32,)>(&counter, Counter::add);
/// ```
pub trait Params: Sized + 'static {
    /// Number of arguments in the list.
    const ARITY: usize;
}

/// A bindable method of `T` taking the argument list `P`.
///
/// Implemented for every `Fn(&T, A1, .., An)` that is `Copy + Send + Sync`.
/// Bindings additionally require the method to be zero-sized (a fn item or a
/// non-capturing closure): its type is then the method's identity, so two
/// methods with identical bodies stay distinct even after the optimizer
/// merges their code.
pub trait Method<T: 'static, P: Params>: Copy + Send + Sync + 'static {
    /// Calls the method on `target`, moving each argument out of `args`.
    fn call(&self, target: &T, args: P);
}

macro_rules! impl_params {
    ($($A:ident),*) => {
        impl<$($A: 'static),*> Params for ($($A,)*) {
            const ARITY: usize = <[&'static str]>::len(&[$(stringify!($A)),*]);
        }

        impl<T: 'static, F, $($A: 'static),*> Method<T, ($($A,)*)> for F
        where
            F: Fn(&T, $($A),*) + Copy + Send + Sync + 'static,
        {
            #[allow(non_snake_case)]
            fn call(&self, target: &T, args: ($($A,)*)) {
                let ($($A,)*) = args;
                self(target, $($A),*)
            }
        }
    };
}

impl_params!();
impl_params!(A1);
impl_params!(A1, A2);
impl_params!(A1, A2, A3);
impl_params!(A1, A2, A3, A4);
impl_params!(A1, A2, A3, A4, A5);
impl_params!(A1, A2, A3, A4, A5, A6);
impl_params!(A1, A2, A3, A4, A5, A6, A7);
impl_params!(A1, A2, A3, A4, A5, A6, A7, A8);
