//! Test helpers.

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{affix_state::inject, prelude::*};
use storefront::{
    charges::OrderCharges,
    orders::{OrderStatus, PaymentMethod, PaymentStatus},
};
use storefront_app::{
    auth::{MockAuthService, Principal, Role},
    context::AppContext,
    domain::{
        carts::{
            MockCartsService,
            records::{CartItemRecord, CartItemUuid, CartRecord, CartUuid},
        },
        coupons::MockCouponsService,
        orders::{
            MockOrdersService,
            records::{OrderItemRecord, OrderItemUuid, OrderRecord, OrderUuid},
        },
        payments::MockPaymentsService,
        products::{MockProductsService, records::ProductUuid},
        users::{AddressUuid, UserUuid},
    },
};
use uuid::Uuid;

use crate::{extensions::*, state::State};

pub(crate) const TEST_USER: UserUuid = UserUuid::from_uuid(Uuid::nil());

/// One mock per service. Any call without an expectation fails the test.
#[derive(Default)]
pub(crate) struct Mocks {
    pub(crate) products: MockProductsService,
    pub(crate) carts: MockCartsService,
    pub(crate) coupons: MockCouponsService,
    pub(crate) orders: MockOrdersService,
    pub(crate) payments: MockPaymentsService,
    pub(crate) auth: MockAuthService,
}

impl Mocks {
    pub(crate) fn into_state(self) -> Arc<State> {
        State::from_app_context(AppContext {
            products: Arc::new(self.products),
            carts: Arc::new(self.carts),
            coupons: Arc::new(self.coupons),
            orders: Arc::new(self.orders),
            payments: Arc::new(self.payments),
            auth: Arc::new(self.auth),
        })
    }
}

pub(crate) fn state_with_auth(auth: MockAuthService) -> Arc<State> {
    Mocks {
        auth,
        ..Mocks::default()
    }
    .into_state()
}

#[salvo::handler]
async fn inject_customer(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    depot.insert_principal(Principal {
        user: TEST_USER,
        role: Role::Customer,
    });

    ctrl.call_next(req, depot, res).await;
}

#[salvo::handler]
async fn inject_admin(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    depot.insert_principal(Principal {
        user: TEST_USER,
        role: Role::Admin,
    });

    ctrl.call_next(req, depot, res).await;
}

/// Serve `route` as an authenticated customer.
pub(crate) fn customer_service(mocks: Mocks, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(mocks.into_state()))
            .hoop(inject_customer)
            .push(route),
    )
}

/// Serve `route` as an authenticated admin.
pub(crate) fn admin_service(mocks: Mocks, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(mocks.into_state()))
            .hoop(inject_admin)
            .push(route),
    )
}

/// Serve `route` with no principal at all.
pub(crate) fn anonymous_service(mocks: Mocks, route: Router) -> Service {
    Service::new(Router::new().hoop(inject(mocks.into_state())).push(route))
}

pub(crate) fn make_cart(items: Vec<(u64, u32)>) -> CartRecord {
    let cart_uuid = CartUuid::new();

    let items: Vec<CartItemRecord> = items
        .into_iter()
        .map(|(price, quantity)| CartItemRecord {
            uuid: CartItemUuid::new(),
            cart_uuid,
            product_uuid: ProductUuid::new(),
            product_name: "Widget".to_string(),
            quantity,
            price_snapshot: price,
            price,
            stock: 10,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        })
        .collect();

    CartRecord {
        uuid: cart_uuid,
        user_uuid: TEST_USER,
        total: items
            .iter()
            .map(|item| item.price_snapshot * u64::from(item.quantity))
            .sum(),
        coupon_uuid: None,
        items,
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}

pub(crate) fn make_order(
    uuid: OrderUuid,
    method: PaymentMethod,
    status: OrderStatus,
    payment_status: PaymentStatus,
) -> OrderRecord {
    OrderRecord {
        uuid,
        user_uuid: TEST_USER,
        address_uuid: AddressUuid::from_uuid(Uuid::nil()),
        charges: OrderCharges {
            subtotal: 2_000,
            discount: 0,
            tax_amount: 150,
            delivery_charge: 500,
            total: 2_650,
        },
        coupon_uuid: None,
        order_status: status,
        payment_status,
        payment_method: method,
        payment_session_id: None,
        payment_intent_id: None,
        checkout_url: None,
        items: vec![OrderItemRecord {
            uuid: OrderItemUuid::new(),
            order_uuid: uuid,
            product_uuid: ProductUuid::new(),
            product_name: "Widget".to_string(),
            quantity: 2,
            unit_price: 1_000,
            created_at: Timestamp::UNIX_EPOCH,
        }],
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}
