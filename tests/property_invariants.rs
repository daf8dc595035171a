use std::collections::BTreeSet;

use proptest::prelude::*;

use freshcart::{
    cart::{indices::Slot, store::CartStore},
    line::{CartLine, LineDraft},
    money::Rupees,
};

#[derive(Debug, Clone)]
enum Action {
    Add { product: u8 },
    SetQuantity { target: u8, quantity: i64 },
    Save { target: u8 },
    Restore { target: u8 },
    Remove { target: u8 },
    ConfirmedRemove { target: u8, confirm: bool },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => (0u8..12).prop_map(|product| Action::Add { product }),
        2 => (0u8..12, -3i64..20).prop_map(|(target, quantity)| Action::SetQuantity { target, quantity }),
        1 => (0u8..12).prop_map(|target| Action::Save { target }),
        1 => (0u8..12).prop_map(|target| Action::Restore { target }),
        1 => (0u8..12).prop_map(|target| Action::Remove { target }),
        1 => (0u8..12, any::<bool>()).prop_map(|(target, confirm)| Action::ConfirmedRemove { target, confirm }),
    ]
}

fn draft_for(product: u8) -> LineDraft {
    let id = u64::from(product) + 1;
    LineDraft::new(id, format!("Product {id}"), Rupees(100 + id * 7), format!("img/{id}"))
}

fn line_id(target: u8) -> u64 {
    u64::from(target) + 1
}

fn check_invariants(store: &CartStore) -> Result<(), TestCaseError> {
    let active: BTreeSet<u64> = store.active().iter().map(|l| l.id).collect();
    let saved: BTreeSet<u64> = store.saved().iter().map(|l| l.id).collect();

    prop_assert_eq!(active.len(), store.active().len(), "duplicate active id");
    prop_assert_eq!(saved.len(), store.saved().len(), "duplicate saved id");
    prop_assert!(active.is_disjoint(&saved), "line in both collections");

    for line in store.active() {
        prop_assert!(line.quantity >= 1);
        prop_assert!(!line.saved);
        prop_assert_eq!(store.slot(line.id), Some(Slot::Active));
    }
    for line in store.saved() {
        prop_assert!(line.quantity >= 1);
        prop_assert!(line.saved);
        prop_assert_eq!(store.slot(line.id), Some(Slot::Saved));
    }

    let expected: u64 = store.active().iter().map(|l| l.unit_price.get() * u64::from(l.quantity)).sum();
    match store.compute_totals() {
        None => prop_assert!(store.active().is_empty()),
        Some(totals) => {
            prop_assert_eq!(totals.subtotal, Rupees(expected));
            prop_assert_eq!(totals.total, Rupees(expected + 49));
        }
    }
    Ok(())
}

fn lines(store: &CartStore) -> (Vec<CartLine>, Vec<CartLine>) {
    (store.active().to_vec(), store.saved().to_vec())
}

proptest! {
    #[test]
    fn random_sequences_preserve_cart_invariants(actions in prop::collection::vec(action_strategy(), 1..200)) {
        let mut store = CartStore::new();

        for action in actions {
            let before = lines(&store);
            match action {
                Action::Add { product } => {
                    let id = line_id(product);
                    let prev = store.get(id).map(|l| l.quantity).unwrap_or(0);
                    let (line, _) = store.add_or_increment(draft_for(product));
                    prop_assert_eq!(line.quantity, prev + 1);
                    prop_assert_eq!(store.slot(id), Some(Slot::Active));
                }
                Action::SetQuantity { target, quantity } => {
                    let id = line_id(target);
                    let res = store.set_quantity(id, quantity);
                    if quantity < 1 || store.slot(id) != Some(Slot::Active) {
                        prop_assert!(res.is_err());
                        prop_assert_eq!(lines(&store), before);
                    } else {
                        prop_assert!(res.is_ok());
                        prop_assert_eq!(i64::from(store.get(id).unwrap().quantity), quantity);
                    }
                }
                Action::Save { target } => {
                    if store.save(line_id(target)).is_err() {
                        prop_assert_eq!(lines(&store), before);
                    }
                }
                Action::Restore { target } => {
                    if store.restore(line_id(target)).is_err() {
                        prop_assert_eq!(lines(&store), before);
                    }
                }
                Action::Remove { target } => {
                    let id = line_id(target);
                    let res = store.remove(id);
                    prop_assert!(store.get(id).is_none());
                    if res.is_err() {
                        prop_assert_eq!(lines(&store), before);
                    }
                }
                Action::ConfirmedRemove { target, confirm } => {
                    let id = line_id(target);
                    if let Ok(token) = store.request_removal(id) {
                        if confirm {
                            prop_assert!(store.confirm_removal(token).is_ok());
                            prop_assert!(store.get(id).is_none());
                        } else {
                            prop_assert!(store.cancel_removal(token));
                            prop_assert_eq!(lines(&store), before);
                        }
                    } else {
                        prop_assert_eq!(lines(&store), before);
                    }
                }
            }

            check_invariants(&store)?;
        }
    }

    #[test]
    fn replaying_drained_ops_reproduces_state(actions in prop::collection::vec(action_strategy(), 1..120)) {
        let mut store = CartStore::new();
        for action in actions {
            match action {
                Action::Add { product } => { store.add_or_increment(draft_for(product)); }
                Action::SetQuantity { target, quantity } => { let _ = store.set_quantity(line_id(target), quantity); }
                Action::Save { target } => { let _ = store.save(line_id(target)); }
                Action::Restore { target } => { let _ = store.restore(line_id(target)); }
                Action::Remove { target } => { let _ = store.remove(line_id(target)); }
                Action::ConfirmedRemove { target, .. } => {
                    if let Ok(token) = store.request_removal(line_id(target)) {
                        let _ = store.confirm_removal(token);
                    }
                }
            }
        }

        let mut replica = CartStore::new();
        for stored in store.drain_pending_ops() {
            prop_assert!(replica.apply_replayed_op(stored).is_ok());
        }
        prop_assert_eq!(lines(&replica), lines(&store));
        prop_assert_eq!(replica.latest_op_seq(), store.latest_op_seq());
    }
}
