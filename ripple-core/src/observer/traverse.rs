//! Deep Traversal
//!
//! Deep watchers read every container reachable from their value so that
//! each nested dependency registers with them. The walk keeps a visited set
//! keyed on container identity, so shared substructure is read once and
//! cyclic graphs terminate.

use std::collections::HashSet;

use smallvec::SmallVec;

use super::value::Value;

/// Register every dependency reachable from `value` with the active
/// subscriber. Frozen containers are skipped along with everything below
/// them.
pub fn traverse(value: &Value) {
    let mut visited: HashSet<usize> = HashSet::new();
    let mut pending: SmallVec<[Value; 16]> = SmallVec::new();
    pending.push(value.clone());

    while let Some(current) = pending.pop() {
        let frozen = match &current {
            Value::Object(obj) => obj.is_frozen(),
            Value::Array(items) => items.is_frozen(),
            _ => continue,
        };
        if frozen {
            continue;
        }
        let Some(addr) = current.addr() else {
            continue;
        };
        if !visited.insert(addr) {
            continue;
        }

        if let Some(observer) = current.observer() {
            observer.dep().depend();
        }
        match &current {
            Value::Object(obj) => {
                for key in obj.keys() {
                    pending.push(obj.get(&key));
                }
            }
            Value::Array(items) => pending.extend(items.to_vec()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{observe, Array, Object};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn reads_every_field() {
        let reads = Arc::new(AtomicUsize::new(0));
        let obj = Object::new();
        for key in ["a", "b", "c"] {
            let reads = reads.clone();
            obj.define_property(
                key,
                crate::observer::Property::accessor(
                    Some(Arc::new(move |_: &Object| {
                        reads.fetch_add(1, Ordering::SeqCst);
                        Value::Null
                    })),
                    None,
                ),
            )
            .unwrap();
        }

        traverse(&Value::from(obj));
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cyclic_graphs_terminate() {
        let a = Object::new();
        let b = Object::new();
        a.set("b", Value::from(b.clone())).unwrap();
        b.set("a", Value::from(a.clone())).unwrap();
        let list = Array::from_iter([Value::from(a.clone())]);
        list.push([Value::from(list.clone())]);

        let root = Value::from(list);
        observe(&root, false);
        traverse(&root);
    }

    #[test]
    fn primitives_are_ignored() {
        traverse(&Value::from(1));
        traverse(&Value::Undefined);
    }
}
