use ndarray::IxDyn;

use crate::{Result, params::ParamStore};

/// The L2 penalty of every variable registered with a weight decay coefficient, in creation
/// order.
///
/// Each term is `wd * sum(w^2) / 2` and is named `"<scope>/weight_loss"`. A coefficient of zero
/// still yields its (zero) term.
pub fn weight_decay_losses(store: &ParamStore) -> Vec<(String, f32)> {
    store
        .variables()
        .filter_map(|(_, var)| {
            let wd = var.weight_decay()?;
            let sum_sq: f32 = store.values()[var.range()].iter().map(|w| w * w).sum();

            Some((format!("{}/weight_loss", var.scope()), wd * sum_sq / 2.))
        })
        .collect()
}

/// Accumulates the gradient of every weight decay term, `wd * w`, into the store.
pub fn accumulate_weight_decay_grads(store: &mut ParamStore) -> Result<()> {
    let decayed: Vec<_> = store
        .variables()
        .filter_map(|(id, var)| var.weight_decay().map(|wd| (id, wd)))
        .filter(|&(_, wd)| wd != 0.)
        .collect();

    for (id, wd) in decayed {
        let (value, mut grad) = store.value_and_grad_mut::<IxDyn>(id)?;
        grad.scaled_add(wd, &value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        initialization::ConstParamGen,
        params::{Reuse, VarId},
    };

    fn constant(value: f32) -> impl FnOnce(usize) -> Result<ConstParamGen> {
        move |n| Ok(ConstParamGen::new(value, n))
    }

    fn store() -> (ParamStore, VarId) {
        let mut store = ParamStore::new();

        let w = store
            .get_variable("fc/weights", &[2, 2], Reuse::No, Some(0.5), constant(2.))
            .unwrap();
        store
            .get_variable("fc/biases", &[2], Reuse::No, None, constant(1.))
            .unwrap();
        store
            .get_variable("logits/weights", &[2, 1], Reuse::No, Some(0.), constant(3.))
            .unwrap();

        (store, w)
    }

    #[test]
    fn named_terms() {
        let (store, _) = store();

        assert_eq!(
            weight_decay_losses(&store),
            [
                ("fc/weight_loss".to_string(), 4.),
                ("logits/weight_loss".to_string(), 0.)
            ]
        );
    }

    #[test]
    fn gradients_accumulate() {
        let (mut store, w) = store();
        store.grad_mut::<IxDyn>(w).unwrap().fill(1.);

        accumulate_weight_decay_grads(&mut store).unwrap();

        // 1 + 0.5 * 2 for the decayed weights, nothing for the rest.
        assert_eq!(store.grads(), [2., 2., 2., 2., 0., 0., 0., 0.]);
    }
}
