use std::{cell::RefCell, rc::Rc};

use convnet::{
    arch::NetworkBuilder,
    loss::{LossFn, SparseSoftmaxCrossEntropy},
    params::{ParamStore, Reuse},
    specs::{InitSpec, LayerSpec, ModelSpec},
};
use ndarray::{Array, Array2, Array4};
use ndarray_rand::RandomExt;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;

const EPS: f32 = 1e-2;
const BATCH: usize = 3;

fn linear_head(std_dev: f32) -> LayerSpec {
    LayerSpec::Dense {
        name: "softmax_linear".into(),
        units: None,
        init: InitSpec::Normal { mean: 0., std_dev },
        bias: 0.2,
        weight_decay: None,
        act_fn: None,
    }
}

// Pooling followed by a linear layer keeps the loss smooth in every variable.
fn mk_pool_spec() -> ModelSpec {
    ModelSpec {
        input: (4, 4, 2),
        num_classes: 3,
        batch_norm_epsilon: 1e-4,
        layers: vec![
            LayerSpec::AvgPool {
                name: "pool".into(),
                size: 2,
                stride: 1,
            },
            linear_head(0.3),
        ],
    }
}

// The normalized activations stay well below the bias, so no unit sits at the relu kink.
fn mk_conv_spec() -> ModelSpec {
    ModelSpec {
        input: (4, 4, 2),
        num_classes: 3,
        batch_norm_epsilon: 1e-4,
        layers: vec![
            LayerSpec::ConvBlock {
                name: "c".into(),
                kernel: (2, 2),
                filters: 3,
                stride: 1,
                init: InitSpec::Normal {
                    mean: 0.,
                    std_dev: 1.,
                },
                bias: 4.,
                weight_decay: None,
            },
            linear_head(0.3),
        ],
    }
}

fn mk_labels() -> Array2<f32> {
    let mut labels = Array2::zeros((BATCH, 3));
    for (i, class) in [2, 0, 1].into_iter().enumerate() {
        labels[[i, class]] = 1.;
    }
    labels
}

/// Compares every backpropagated gradient against central differences of the loss and
/// returns the store holding those gradients.
fn check_finite_differences(spec: &ModelSpec, tolerance: f32) -> ParamStore {
    let mut rng = StdRng::seed_from_u64(21);
    let builder = NetworkBuilder::new(Rc::new(RefCell::new(StdRng::seed_from_u64(5))));

    let mut store = ParamStore::new();
    let mut net = builder.build(spec, &mut store, Reuse::No).unwrap();

    let (h, w, c) = spec.input;
    let x: Array4<f32> = Array::random_using((BATCH, h, w, c), StandardNormal, &mut rng);
    let labels = mk_labels();
    let ce = SparseSoftmaxCrossEntropy::new();

    store.zero_grad();
    let logits = net.forward(&store, x.clone().into_dyn()).unwrap();
    let d = ce.loss_prime(logits.view(), labels.view()).unwrap();
    net.backward(&mut store, d).unwrap();
    let grads = store.grads().to_vec();

    for (i, &g) in grads.iter().enumerate() {
        let original = store.values()[i];

        store.values_mut()[i] = original + EPS;
        let logits = net.forward(&store, x.clone().into_dyn()).unwrap();
        let plus = ce.loss(logits.view(), labels.view()).unwrap();

        store.values_mut()[i] = original - EPS;
        let logits = net.forward(&store, x.clone().into_dyn()).unwrap();
        let minus = ce.loss(logits.view(), labels.view()).unwrap();

        store.values_mut()[i] = original;

        let numeric = (plus - minus) / (2. * EPS);
        assert!(
            (numeric - g).abs() < tolerance * (1. + g.abs()),
            "variable {i}: {numeric} != {g}"
        );
    }

    store
}

#[test]
fn backward_matches_finite_differences() {
    check_finite_differences(&mk_pool_spec(), 1e-3);
}

#[test]
fn conv_block_backward_matches_finite_differences() {
    let store = check_finite_differences(&mk_conv_spec(), 2e-3);

    for name in ["c/weights", "c/biases"] {
        let id = store.lookup(name).unwrap();
        let range = store.variable(id).range();

        assert!(
            store.grads()[range].iter().any(|&g| g.abs() > 1e-4),
            "{name} received no gradient"
        );
    }
}
