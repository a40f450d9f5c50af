//! Operator algebra for blueprints.
//!
//! `a + b`, `a - b`, `a * b` and `a / b` on blueprints build anonymous
//! function blueprints over the two operands, so graphs can be written as
//! expressions at declaration time. Every owned/borrowed operand combination
//! is supported. The matrix-style operator, which Rust has no symbol for, is
//! spelled [`Blueprint::compose`].

use std::ops::{Add, Div, Mul, Sub};

use super::Blueprint;
use crate::graph::value::AnyValue;

/// Matrix product or function composition, user-defined per type.
pub trait Compose<Rhs = Self> {
    type Output;

    fn compose(self, rhs: Rhs) -> Self::Output;
}

impl<A: AnyValue + Clone> Blueprint<A> {
    /// Anonymous blueprint applying [`Compose`] to the two operands.
    pub fn compose<B>(&self, rhs: &Blueprint<B>) -> Blueprint<<A as Compose<B>>::Output>
    where
        A: Compose<B>,
        B: AnyValue + Clone,
        <A as Compose<B>>::Output: AnyValue,
    {
        Blueprint::combine("compose", self, rhs, |a: &A, b: &B| {
            Compose::compose(a.clone(), b.clone())
        })
    }
}

macro_rules! binary_op {
    ($trait:ident, $method:ident, $label:literal) => {
        impl<'a, 'b, A, B> $trait<&'b Blueprint<B>> for &'a Blueprint<A>
        where
            A: AnyValue + Clone + $trait<B>,
            B: AnyValue + Clone,
            <A as $trait<B>>::Output: AnyValue,
        {
            type Output = Blueprint<<A as $trait<B>>::Output>;

            fn $method(self, rhs: &'b Blueprint<B>) -> Self::Output {
                Blueprint::combine($label, self, rhs, |a: &A, b: &B| {
                    $trait::$method(a.clone(), b.clone())
                })
            }
        }

        impl<A, B> $trait<Blueprint<B>> for Blueprint<A>
        where
            A: AnyValue + Clone + $trait<B>,
            B: AnyValue + Clone,
            <A as $trait<B>>::Output: AnyValue,
        {
            type Output = Blueprint<<A as $trait<B>>::Output>;

            fn $method(self, rhs: Blueprint<B>) -> Self::Output {
                <&Blueprint<A> as $trait<&Blueprint<B>>>::$method(&self, &rhs)
            }
        }

        impl<'b, A, B> $trait<&'b Blueprint<B>> for Blueprint<A>
        where
            A: AnyValue + Clone + $trait<B>,
            B: AnyValue + Clone,
            <A as $trait<B>>::Output: AnyValue,
        {
            type Output = Blueprint<<A as $trait<B>>::Output>;

            fn $method(self, rhs: &'b Blueprint<B>) -> Self::Output {
                <&Blueprint<A> as $trait<&Blueprint<B>>>::$method(&self, rhs)
            }
        }

        impl<'a, A, B> $trait<Blueprint<B>> for &'a Blueprint<A>
        where
            A: AnyValue + Clone + $trait<B>,
            B: AnyValue + Clone,
            <A as $trait<B>>::Output: AnyValue,
        {
            type Output = Blueprint<<A as $trait<B>>::Output>;

            fn $method(self, rhs: Blueprint<B>) -> Self::Output {
                <&Blueprint<A> as $trait<&Blueprint<B>>>::$method(self, &rhs)
            }
        }
    };
}

binary_op!(Add, add, "add");
binary_op!(Sub, sub, "sub");
binary_op!(Mul, mul, "mul");
binary_op!(Div, div, "div");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::BlueprintKind;
    use crate::graph::value::{downcast_value, value_ref, ValueRef};

    fn apply(blueprint: &Blueprint<f64>, args: &[ValueRef]) -> f64 {
        let BlueprintKind::Function(fun) = blueprint.raw().kind() else {
            panic!("operator result must be a function blueprint");
        };
        let out = fun(args).unwrap();
        *downcast_value::<f64>(&out).unwrap()
    }

    #[test]
    fn operators_build_anonymous_binary_blueprints() {
        let a = Blueprint::<f64>::source();
        let b = Blueprint::<f64>::source();

        let sum = &a + &b;
        assert!(sum.raw().is_anonymous());
        assert_eq!(sum.raw().arg_count(), 2);
        assert!(sum.raw().display_name().starts_with("<add #"));

        let args = [value_ref(6.0_f64), value_ref(4.0_f64)];
        assert_eq!(apply(&sum, &args), 10.0);
        assert_eq!(apply(&(&a - &b), &args), 2.0);
        assert_eq!(apply(&(&a * &b), &args), 24.0);
        assert_eq!(apply(&(&a / &b), &args), 1.5);
    }

    #[test]
    fn owned_operands_chain() {
        let a = Blueprint::<f64>::source();
        let b = Blueprint::<f64>::source();
        let c = Blueprint::<f64>::source();

        // (a + b) / c: the outer node's first argument is the inner sum
        let expr = (&a + &b) / &c;
        assert_eq!(expr.raw().args()[1], *c.raw());
        assert_eq!(expr.raw().args()[0].args(), &[a.raw().clone(), b.raw().clone()]);
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Scale(f64);

    impl Compose<f64> for Scale {
        type Output = f64;

        fn compose(self, rhs: f64) -> f64 {
            self.0 * rhs
        }
    }

    #[test]
    fn compose_uses_user_trait() {
        let scale = Blueprint::<Scale>::source();
        let x = Blueprint::<f64>::source();
        let scaled = scale.compose(&x);
        let args = [value_ref(Scale(3.0)), value_ref(2.0_f64)];
        assert_eq!(apply(&scaled, &args), 6.0);
        assert!(scaled.raw().display_name().starts_with("<compose #"));
    }
}
