//! Receipt fixtures shared by unit tests.
use serde_json::{json, Value};

pub const V1_TARGET: &str = "b3249b9e485f28f6f4a7834e21b53e329a17ff4074b1a41dd36863af8db65d7a";
pub const V1_S1: &str = "edf39a9e53c446a395dc5c6d9bd99f9bb95abf17e9a6597c9f77983ce5b110a2";
pub const V1_P1: &str = "196931d20a834c370bf450e47850defff0d18903d3e5ee147384653aa3d8587e";
pub const V1_S2: &str = "1ac131fe48906a940ce88f03e451c4dd0259c344214f8b31fe9436bceb87d19e";
pub const V1_P2: &str = "b59e4a5331bc6234ba0fd4fb8608ad2743e62e1f0dea9879198a58dfd78949ac";
pub const V1_S3: &str = "b7ccc45e36aa1f262b59136d7e3773e795353b1320cd67287c1db0e9c507645b";
pub const V1_ROOT: &str = "62aa7d45a50f6b0ae92ee6b2bf26b4e18cd5f4279fc094641c3cef19aedea41f";
pub const V1_TX: &str = "3ba48f01bcf7cbd1c0a5ec0d2b1b0c6f0c0a4b6f4b7fd0b3e51ad1c2e4b7a901";

pub const V2_ROOT: &str = "54a013cec303b23589afec4cb2938c4aedad432a69bfff48715ccaf1f057e97d";
pub const V2_TX: &str = "c1e5d8a7f1b7e0e2f6a9b4d3c2e1f0a9b8c7d6e5f4a3b2c1d0e9f8a7b6c5d4e3";

pub const V2_512_TARGET: &str = "3c52af7a548083f3dad732f8eefbdb50de3ab60b9a50eda6be0b244356dec3cc898bd9ef63e46e5bbe61da33246bcff9dd7c20215ad071e9ce3b91c4aebef9e8";
pub const V2_512_SIBLING: &str = "a4abd4448c49562d828115d13a1fccea927f52b4d5459297f8b43e42da89238bc13626e43dcb38ddb082488927ec904fb42057443983e88585179d50551afe62";
pub const V2_512_ROOT: &str = "dfd2c65c67c76333228fceb489f721e534ca1aa3fa8887e2f651af98cbd65f3fc5154f1124c311086adb57e8b7ab18df8845b42021311be58152b58463e0a5ee";

/// v1 receipt with a three-branch proof: target is a left child, then a
/// right child, then a left child.
pub fn v1_receipt() -> Value {
    json!({
        "header": {
            "chainpoint_version": "1.0",
            "hash_type": "SHA-256",
            "merkle_root": V1_ROOT,
            "tx_id": V1_TX,
            "timestamp": 1_500_000_000
        },
        "target": {
            "target_hash": V1_TARGET,
            "target_proof": [
                { "left": V1_TARGET, "right": V1_S1, "parent": V1_P1 },
                { "left": V1_S2, "right": V1_P1, "parent": V1_P2 },
                { "left": V1_P2, "right": V1_S3, "parent": V1_ROOT }
            ]
        }
    })
}

/// v2 receipt over the same target: `{left: S1}` then `{right: S2}`.
pub fn v2_receipt() -> Value {
    json!({
        "@context": "https://w3id.org/chainpoint/v2",
        "type": "ChainpointSHA256v2",
        "targetHash": V1_TARGET,
        "merkleRoot": V2_ROOT,
        "proof": [{ "left": V1_S1 }, { "right": V1_S2 }],
        "anchors": [{ "type": "BTCOpReturn", "sourceId": V2_TX }]
    })
}

/// Single-leaf v1 receipt where the target is the root.
pub fn trivial_v1_receipt(target: &str, tx_id: &str) -> Value {
    json!({
        "header": {
            "chainpoint_version": "1.0",
            "hash_type": "SHA-256",
            "merkle_root": target,
            "tx_id": tx_id,
            "timestamp": 1_500_000_000
        },
        "target": { "target_hash": target, "target_proof": [] }
    })
}
