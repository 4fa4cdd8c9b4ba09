//! Fuzz target for arbitrary trip sequences.
//!
//! Applies decoded operations to both the reference model and the real
//! registry on a virtual clock.
//!
//! # Invariants
//!
//! - Model and registry agree on every operation result
//! - Model and registry agree on every phase at the end
//! - At most one station is ACTIVE; active facilities have active owners
//! - Journal entries step exactly one phase; facilities finish before owners
//! - A rejected operation leaves the journal untouched

#![no_main]

use libfuzzer_sys::fuzz_target;
use transit_harness::{InvariantRegistry, ModelWorld, Operation, OperationResult, SimDriver};

fuzz_target!(|ops: Vec<Operation>| {
    let Ok(runtime) = tokio::runtime::Builder::new_current_thread().enable_time().build() else {
        return;
    };

    runtime.block_on(async {
        let mut model = ModelWorld::new();
        let mut real = SimDriver::new().with_invariants(InvariantRegistry::standard());

        for op in ops.iter().take(256) {
            let journal = real.traffic().journal().len();
            let model_result = model.apply(op);
            let real_result = real.apply(op).await;

            assert_eq!(model_result, real_result, "divergence on {op:?}");
            if real_result == OperationResult::Rejected {
                assert_eq!(real.traffic().journal().len(), journal, "rejected {op:?} mutated");
            }
        }

        assert_eq!(model.observable_state(), real.observable_state());
    });
});
