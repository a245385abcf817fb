//! Property-based tests for pricing arithmetic and checkout validation.
//!
//! These use proptest to check the invariants across many carts rather than
//! a few hand-picked ones.

use proptest::prelude::*;
use rust_decimal::Decimal;
use storefront_api::{
    errors::ServiceError,
    services::commerce::{
        checkout_validator, money, CartLine, ClientCheckoutLine, PricingEngine, PricingPolicy,
    },
};

fn cart_line_strategy() -> impl Strategy<Value = (i32, i32, i64)> {
    (1i32..10_000, 1i32..50, 1i64..100_000)
}

fn cart_strategy() -> impl Strategy<Value = Vec<CartLine>> {
    prop::collection::vec(cart_line_strategy(), 1..8).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (product_id, quantity, unit_price_cents))| CartLine {
                cart_item_id: i as i32 + 1,
                // keep product ids distinct within a cart
                product_id: product_id * 10 + i as i32,
                product_name: format!("Product {}", product_id),
                quantity,
                unit_price_cents,
                available_stock: quantity + 5,
            })
            .collect()
    })
}

fn echo(lines: &[CartLine]) -> Vec<ClientCheckoutLine> {
    lines
        .iter()
        .map(|l| ClientCheckoutLine {
            product_id: l.product_id,
            quantity: l.quantity,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn totals_add_up(
        cart in cart_strategy(),
        shipping in 0i64..5_000,
        bps in 0u32..=10_000,
    ) {
        let engine = PricingEngine::new(PricingPolicy {
            shipping_flat_cents: shipping,
            tax_rate_bps: bps,
        });
        let lines = checkout_validator::validate(1, &echo(&cart), cart.clone()).unwrap();
        let result = engine.price(&lines).unwrap();

        let expected_subtotal: i64 = cart
            .iter()
            .map(|l| l.unit_price_cents * i64::from(l.quantity))
            .sum();
        prop_assert_eq!(result.subtotal_cents, expected_subtotal);
        prop_assert_eq!(result.shipping_cents, shipping);

        let pre_tax = expected_subtotal + shipping;
        prop_assert_eq!(result.tax_cents, (pre_tax * i64::from(bps) + 5_000) / 10_000);
        prop_assert_eq!(
            result.total_cents,
            result.subtotal_cents + result.shipping_cents + result.tax_cents
        );
        prop_assert!(result.tax_cents >= 0);
    }

    #[test]
    fn pricing_is_deterministic(cart in cart_strategy()) {
        let engine = PricingEngine::default();
        let lines = checkout_validator::validate(1, &echo(&cart), cart).unwrap();
        prop_assert_eq!(engine.price(&lines).unwrap(), engine.price(&lines).unwrap());
    }

    #[test]
    fn two_decimal_prices_convert_exactly(cents in 0i64..1_000_000_000) {
        let price = Decimal::new(cents, 2);
        prop_assert_eq!(money::decimal_to_cents(price), Some(cents));
    }

    #[test]
    fn changed_quantity_is_a_mismatch(
        cart in cart_strategy(),
        pick in any::<prop::sample::Index>(),
        delta in 1i32..5,
    ) {
        let mut client = echo(&cart);
        let i = pick.index(client.len());
        client[i].quantity += delta;

        let result = checkout_validator::validate(1, &client, cart);
        prop_assert!(matches!(result, Err(ServiceError::CartMismatch(_))));
    }

    #[test]
    fn dropped_line_is_a_mismatch(
        cart in cart_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut client = echo(&cart);
        client.remove(pick.index(client.len()));

        let result = checkout_validator::validate(1, &client, cart);
        prop_assert!(matches!(result, Err(ServiceError::CartMismatch(_))));
    }

    #[test]
    fn swapped_lines_are_a_mismatch(cart in cart_strategy()) {
        prop_assume!(cart.len() >= 2);
        let mut client = echo(&cart);
        client.swap(0, 1);

        let result = checkout_validator::validate(1, &client, cart);
        prop_assert!(matches!(result, Err(ServiceError::CartMismatch(_))));
    }

    #[test]
    fn empty_cart_wins_over_any_client_lines(
        client_ids in prop::collection::vec(1i32..100, 0..5),
    ) {
        let client: Vec<ClientCheckoutLine> = client_ids
            .into_iter()
            .map(|product_id| ClientCheckoutLine { product_id, quantity: 1 })
            .collect();

        let result = checkout_validator::validate(1, &client, Vec::new());
        prop_assert!(matches!(result, Err(ServiceError::EmptyCart)));
    }
}
