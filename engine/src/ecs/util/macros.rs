/// Invoke a macro once for every suffix of a list of type idents, producing tuple impls of every
/// arity from the full list down to one.
#[macro_export]
macro_rules! for_every_tuple {
    ($m:ident !! $head_ty:ident) => {
        $m!($head_ty);
    };
    ($m:ident !! $head_ty:ident, $($tail_ty:ident),*) => (
        $m!($head_ty, $( $tail_ty ),*);
        $crate::for_every_tuple!($m !! $( $tail_ty ),*);
    );
}

/// Apply a macro to tuples of one to sixteen elements.
#[macro_export]
macro_rules! all_tuples {
    ($m:ident) => {
        $crate::for_every_tuple!($m !! A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P);
    };
}

#[cfg(test)]
mod tests {
    use std::marker::PhantomData;

    struct Data<Params>(PhantomData<Params>);

    macro_rules! arity {
         ($($name: ident),*) => {
            #[allow(dead_code)]
            impl<$($name),*> Data<($($name,)*)> {
                pub fn arity(&self) -> usize {
                    [$(stringify!($name)),*].len()
                 }
            }
        }
    }

    all_tuples!(arity);

    #[test]
    fn tuples_cover_every_arity() {
        assert_eq!(Data::<(u8,)>(PhantomData).arity(), 1);
        assert_eq!(Data::<(u8, u16, u32)>(PhantomData).arity(), 3);
        assert_eq!(
            Data::<(u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8)>(PhantomData)
                .arity(),
            16
        );
    }
}
