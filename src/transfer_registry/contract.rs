//! ABI bindings for the on-chain transfer definition registry.

use alloy::sol;

sol! {
    #[sol(rpc, all_derives)]
    interface ITransferRegistry {
        struct RegisteredTransfer {
            string name;
            address definition;
            string stateEncoding;
            string resolverEncoding;
            bytes encodedCancel;
        }

        /// Owner only.
        function addTransferDefinition(RegisteredTransfer memory definition) external;

        /// Owner only.
        function removeTransferDefinition(string memory name) external;

        function getTransferDefinitions() external view returns (RegisteredTransfer[] memory);
    }
}

pub use ITransferRegistry::RegisteredTransfer;
