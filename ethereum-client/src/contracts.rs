use alloy_sol_types::sol;

sol! {
    interface IAxiomV2Query {
        struct AxiomV2ComputeQuery {
            uint8 k;
            uint16 resultLen;
            bytes32[] vkey;
            bytes computeProof;
        }

        struct AxiomV2Callback {
            address target;
            bytes extraData;
        }

        struct AxiomV2FeeData {
            uint64 maxFeePerGas;
            uint32 callbackGasLimit;
            uint256 overrideAxiomQueryFee;
        }

        function sendQuery(
            uint64 sourceChainId,
            bytes32 dataQueryHash,
            AxiomV2ComputeQuery calldata computeQuery,
            AxiomV2Callback calldata callback,
            AxiomV2FeeData calldata feeData,
            bytes32 userSalt,
            address refundee,
            bytes calldata dataQuery
        ) external payable returns (uint256 queryId);
    }
}

pub use IAxiomV2Query::{
    sendQueryCall, AxiomV2Callback, AxiomV2ComputeQuery, AxiomV2FeeData, IAxiomV2QueryCalls,
};
