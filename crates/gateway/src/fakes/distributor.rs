//! In-memory distributor.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::{Money, PoNumber};

use crate::distributor::{
    CartCreated, DistributorApi, DistributorCart, DistributorLineItem, ExternalOrderRecord,
    OrderCreated,
};
use crate::error::{GatewayError, Result, Service};

/// A call made against the fake, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributorCall {
    CreateCart(PoNumber),
    AddItem(PoNumber, String),
    CreateOrder(PoNumber),
    DeleteCart(PoNumber),
    GetOrder(PoNumber),
}

#[derive(Debug)]
struct OpenCart {
    cart: DistributorCart,
    lines: Vec<DistributorLineItem>,
}

#[derive(Debug, Default)]
struct InMemoryDistributorState {
    carts: HashMap<PoNumber, OpenCart>,
    created: HashMap<PoNumber, DistributorCart>,
    orders: HashMap<PoNumber, ExternalOrderRecord>,
    prices: HashMap<String, Money>,
    calls: Vec<DistributorCall>,
    next_order: u32,
    add_item_calls: usize,
    fail_on_create_cart: bool,
    fail_on_add_item: Option<usize>,
    fail_on_create_order: bool,
    fail_on_delete_cart: bool,
}

/// In-memory distributor for testing.
///
/// Prices lines from a per-SKU price table (unknown SKUs cost nothing) and
/// records every call for ordering assertions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDistributor {
    state: Arc<RwLock<InMemoryDistributorState>>,
}

impl InMemoryDistributor {
    /// Creates a new in-memory distributor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the distributor's price for a SKU.
    pub fn set_price(&self, sku: &str, price: Money) {
        self.state
            .write()
            .unwrap()
            .prices
            .insert(sku.to_string(), price);
    }

    /// Configures create_cart to fail.
    pub fn set_fail_on_create_cart(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create_cart = fail;
    }

    /// Makes the `n`th add_item call (1-based, counted across carts) fail.
    pub fn set_fail_on_add_item(&self, n: Option<usize>) {
        self.state.write().unwrap().fail_on_add_item = n;
    }

    /// Configures create_order to fail.
    pub fn set_fail_on_create_order(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create_order = fail;
    }

    /// Configures delete_cart to fail.
    pub fn set_fail_on_delete_cart(&self, fail: bool) {
        self.state.write().unwrap().fail_on_delete_cart = fail;
    }

    /// Returns every call made so far.
    pub fn calls(&self) -> Vec<DistributorCall> {
        self.state.read().unwrap().calls.clone()
    }

    /// Returns the number of recorded calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&DistributorCall) -> bool) -> usize {
        self.state.read().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    /// Returns the number of carts still open.
    pub fn open_cart_count(&self) -> usize {
        self.state.read().unwrap().carts.len()
    }

    /// Returns the number of orders created.
    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }

    /// Returns the cart as it was created, even after it became an order.
    pub fn created_cart(&self, po_number: &PoNumber) -> Option<DistributorCart> {
        self.state.read().unwrap().created.get(po_number).cloned()
    }

    /// Returns the lines of an open cart.
    pub fn cart_lines(&self, po_number: &PoNumber) -> Option<Vec<DistributorLineItem>> {
        self.state
            .read()
            .unwrap()
            .carts
            .get(po_number)
            .map(|open| open.lines.clone())
    }

    fn unavailable(operation: &str) -> GatewayError {
        GatewayError::http(
            Service::Distributor,
            503,
            format!("{operation} unavailable"),
        )
    }

    fn no_cart(po_number: &PoNumber) -> GatewayError {
        GatewayError::NotFound {
            service: Service::Distributor,
            resource: format!("carts/{po_number}"),
        }
    }
}

#[async_trait]
impl DistributorApi for InMemoryDistributor {
    async fn create_cart(&self, cart: &DistributorCart) -> Result<CartCreated> {
        let mut state = self.state.write().unwrap();
        state
            .calls
            .push(DistributorCall::CreateCart(cart.po_number.clone()));

        if state.fail_on_create_cart {
            return Err(Self::unavailable("create cart"));
        }
        if state.carts.contains_key(&cart.po_number) || state.orders.contains_key(&cart.po_number)
        {
            return Err(GatewayError::http(
                Service::Distributor,
                409,
                format!("cart {} already exists", cart.po_number),
            ));
        }

        state.created.insert(cart.po_number.clone(), cart.clone());
        state.carts.insert(
            cart.po_number.clone(),
            OpenCart {
                cart: cart.clone(),
                lines: Vec::new(),
            },
        );
        Ok(CartCreated {
            id: cart.po_number.to_string(),
        })
    }

    async fn add_item(&self, po_number: &PoNumber, item: &DistributorLineItem) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state
            .calls
            .push(DistributorCall::AddItem(po_number.clone(), item.sku.clone()));
        state.add_item_calls += 1;

        if state.fail_on_add_item == Some(state.add_item_calls) {
            return Err(Self::unavailable("add item"));
        }

        let open = state
            .carts
            .get_mut(po_number)
            .ok_or_else(|| Self::no_cart(po_number))?;
        open.lines.push(item.clone());
        Ok(())
    }

    async fn create_order(&self, po_number: &PoNumber) -> Result<OrderCreated> {
        let mut state = self.state.write().unwrap();
        state
            .calls
            .push(DistributorCall::CreateOrder(po_number.clone()));

        if state.fail_on_create_order {
            return Err(Self::unavailable("create order"));
        }

        let open = state
            .carts
            .remove(po_number)
            .ok_or_else(|| Self::no_cart(po_number))?;
        let total: Money = open
            .lines
            .iter()
            .map(|line| {
                state
                    .prices
                    .get(&line.sku)
                    .copied()
                    .unwrap_or_default()
                    .multiply(line.quantity)
            })
            .sum();

        state.next_order += 1;
        let order_number = format!("SO-{:06}", state.next_order);
        state.orders.insert(
            po_number.clone(),
            ExternalOrderRecord {
                po_number: open.cart.po_number.clone(),
                external_order_number: Some(order_number.clone()),
                status: "submitted".to_string(),
                total,
                created_at: Some(Utc::now()),
            },
        );

        Ok(OrderCreated {
            order_number,
            status: "submitted".to_string(),
            total,
        })
    }

    async fn delete_cart(&self, po_number: &PoNumber) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state
            .calls
            .push(DistributorCall::DeleteCart(po_number.clone()));

        if state.fail_on_delete_cart {
            return Err(Self::unavailable("delete cart"));
        }

        state
            .carts
            .remove(po_number)
            .map(|_| ())
            .ok_or_else(|| Self::no_cart(po_number))
    }

    async fn get_order(&self, po_number: &PoNumber) -> Result<ExternalOrderRecord> {
        let mut state = self.state.write().unwrap();
        state.calls.push(DistributorCall::GetOrder(po_number.clone()));

        state
            .orders
            .get(po_number)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                service: Service::Distributor,
                resource: format!("orders/{po_number}"),
            })
    }
}
