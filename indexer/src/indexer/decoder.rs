//! Maps the node's wire types onto the entities the index persists.
//!
//! Everything here is a pure function. Observe times are left as [`ObserveTime::Commit`] so the
//! database stamps each row when it is written.

use crate::models::{Block, DataStore, Transaction, TransactionInput, ValueStore};
use entity_store::ObserveTime;
use rpc_core::{BlockHeader, MinedTransaction, TxOutput};

/// A decoded transaction output, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Data(DataStore),
    Value(ValueStore),
}

impl Output {
    pub fn owner(&self) -> &str {
        match self {
            Output::Data(data) => &data.owner,
            Output::Value(value) => &value.owner,
        }
    }

    pub fn transaction_hash(&self) -> &str {
        match self {
            Output::Data(data) => &data.transaction_hash,
            Output::Value(value) => &value.transaction_hash,
        }
    }

    pub fn output_index(&self) -> i64 {
        match self {
            Output::Data(data) => data.output_index,
            Output::Value(value) => value.output_index,
        }
    }
}

/// The block row for a header. The height comes from the header's own claims.
pub fn decode_block(header: &BlockHeader) -> Block {
    let claims = &header.claims;
    Block {
        height: i64::from(claims.height),
        chain_id: i64::from(claims.chain_id),
        transaction_count: i64::from(claims.tx_count),
        previous_block_hash: claims.prev_block.clone(),
        transaction_root_hash: claims.tx_root.clone(),
        state_root_hash: claims.state_root.clone(),
        header_root_hash: claims.header_root.clone(),
        group_signature_hash: header.sig_group.clone(),
        transaction_hashes: header.tx_hashes.clone(),
        observe_time: ObserveTime::Commit,
    }
}

/// A transaction discovered at `height` whose details were fetched.
pub fn decode_transaction(height: u32, hash: &str) -> Transaction {
    Transaction {
        height: i64::from(height),
        transaction_hash: hash.to_string(),
        observe_time: ObserveTime::Commit,
        missing: None,
    }
}

/// A transaction listed at `height` that the node no longer serves.
pub fn missing_transaction(height: u32, hash: &str) -> Transaction {
    Transaction {
        missing: Some(true),
        ..decode_transaction(height, hash)
    }
}

/// One row per input, indexed by position.
pub fn decode_inputs(tx: &MinedTransaction) -> Vec<TransactionInput> {
    tx.tx
        .vin
        .iter()
        .enumerate()
        .map(|(index, input)| TransactionInput {
            transaction_hash: input.linker.tx_hash.clone(),
            input_index: index as i64,
            chain_id: i64::from(input.linker.pre_image.chain_id),
            consumed_transaction_hash: input.linker.pre_image.consumed_tx_hash.clone(),
            consumed_transaction_index: i64::from(input.linker.pre_image.consumed_tx_idx),
            signature: input.signature.clone(),
            observe_time: ObserveTime::Commit,
        })
        .collect()
}

/// Outputs in source order. Entries with neither shape are skipped, and each output keeps the
/// out-index the node embedded in it.
pub fn decode_outputs(tx: &MinedTransaction) -> Vec<Output> {
    tx.tx
        .vout
        .iter()
        .filter_map(|vout| {
            if vout.data_store.is_some() && vout.value_store.is_some() {
                tracing::warn!("output carries both a data store and a value store; keeping the data store");
            }
            vout.output()
        })
        .map(|output| match output {
            TxOutput::Data(data) => {
                let pre_image = data.linker.pre_image;
                Output::Data(DataStore {
                    transaction_hash: data.linker.tx_hash,
                    output_index: i64::from(pre_image.tx_out_idx),
                    signature: data.signature,
                    chain_id: i64::from(pre_image.chain_id),
                    data_index: pre_image.index,
                    issued_at: i64::from(pre_image.issued_at),
                    deposit: pre_image.deposit,
                    raw_data: pre_image.raw_data,
                    owner: pre_image.owner,
                    fee: pre_image.fee,
                    observe_time: ObserveTime::Commit,
                })
            }
            TxOutput::Value(value) => {
                let pre_image = value.pre_image;
                Output::Value(ValueStore {
                    transaction_hash: value.tx_hash,
                    output_index: i64::from(pre_image.tx_out_idx),
                    chain_id: i64::from(pre_image.chain_id),
                    value: pre_image.value,
                    owner: pre_image.owner,
                    fee: pre_image.fee,
                    observe_time: ObserveTime::Commit,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpc_core::*;

    fn header() -> BlockHeader {
        BlockHeader {
            claims: BlockClaims {
                chain_id: 42,
                height: 9,
                tx_count: 2,
                prev_block: "prev".into(),
                tx_root: "txroot".into(),
                state_root: "stateroot".into(),
                header_root: "headerroot".into(),
            },
            sig_group: "sig".into(),
            tx_hashes: vec!["a".into(), "b".into()],
        }
    }

    fn value_out(idx: u32, owner: &str, value: &str) -> Vout {
        Vout {
            data_store: None,
            value_store: Some(ValueStoreOut {
                pre_image: ValueStorePreImage {
                    chain_id: 42,
                    value: value.into(),
                    tx_out_idx: idx,
                    owner: owner.into(),
                    fee: "1".into(),
                },
                tx_hash: "tx".into(),
            }),
        }
    }

    fn data_out(idx: u32, owner: &str, index: &str) -> Vout {
        Vout {
            data_store: Some(DataStoreOut {
                linker: DataStoreLinker {
                    pre_image: DataStorePreImage {
                        chain_id: 42,
                        index: index.into(),
                        issued_at: 3,
                        deposit: "10".into(),
                        raw_data: "payload".into(),
                        tx_out_idx: idx,
                        owner: owner.into(),
                        fee: "2".into(),
                    },
                    tx_hash: "tx".into(),
                },
                signature: "dsig".into(),
            }),
            value_store: None,
        }
    }

    #[test]
    fn test_decode_block_uses_header_claims() {
        let block = decode_block(&header());
        assert_eq!(block.height, 9);
        assert_eq!(block.chain_id, 42);
        assert_eq!(block.transaction_count, 2);
        assert_eq!(block.previous_block_hash, "prev");
        assert_eq!(block.group_signature_hash, "sig");
        assert_eq!(block.transaction_hashes, vec!["a", "b"]);
        assert_eq!(block.observe_time, ObserveTime::Commit);
    }

    #[test]
    fn test_missing_transaction_flag() {
        assert_eq!(decode_transaction(4, "h").missing, None);
        let missing = missing_transaction(4, "h");
        assert_eq!(missing.missing, Some(true));
        assert_eq!(missing.height, 4);
        assert_eq!(missing.transaction_hash, "h");
    }

    #[test]
    fn test_inputs_indexed_by_position() {
        let input = |consumed: &str| TxIn {
            linker: TxInLinker {
                pre_image: TxInPreImage { chain_id: 42, consumed_tx_idx: 7, consumed_tx_hash: consumed.into() },
                tx_hash: "tx".into(),
            },
            signature: "s".into(),
        };
        let tx = MinedTransaction {
            tx: Tx { fee: "0".into(), vin: vec![input("x"), input("y")], vout: vec![] },
        };

        let inputs = decode_inputs(&tx);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].input_index, 0);
        assert_eq!(inputs[0].consumed_transaction_hash, "x");
        assert_eq!(inputs[1].input_index, 1);
        assert_eq!(inputs[1].consumed_transaction_index, 7);
        assert_eq!(inputs[1].transaction_hash, "tx");
    }

    #[test]
    fn test_outputs_keep_order_and_source_index() {
        let tx = MinedTransaction {
            tx: Tx {
                fee: "0".into(),
                vin: vec![],
                vout: vec![data_out(5, "y", "k"), Vout::default(), value_out(2, "x", "a")],
            },
        };

        let outputs = decode_outputs(&tx);
        assert_eq!(outputs.len(), 2);

        match &outputs[0] {
            Output::Data(data) => {
                assert_eq!(data.output_index, 5);
                assert_eq!(data.owner, "y");
                assert_eq!(data.data_index, "k");
                assert_eq!(data.raw_data, "payload");
                assert_eq!(data.signature, "dsig");
            }
            other => panic!("expected data store, got {other:?}"),
        }
        match &outputs[1] {
            Output::Value(value) => {
                assert_eq!(value.output_index, 2);
                assert_eq!(value.value, "a");
            }
            other => panic!("expected value store, got {other:?}"),
        }
    }

    #[test]
    fn test_data_store_wins_when_both_shapes_present() {
        let mut vout = data_out(0, "y", "k");
        vout.value_store = value_out(0, "x", "a").value_store;
        let tx = MinedTransaction { tx: Tx { fee: "0".into(), vin: vec![], vout: vec![vout] } };

        let outputs = decode_outputs(&tx);
        assert_eq!(outputs.len(), 1);
        assert!(matches!(outputs[0], Output::Data(_)));
        assert_eq!(outputs[0].owner(), "y");
    }
}
