use ethers::types::Address;
use gasless_primitives::{UserOperation, UserOperationSponsorship};
use jsonrpsee::{core::RpcResult, proc_macros::rpc};

/// The `pm` namespace methods served by a paymaster
#[rpc(client, server, namespace = "pm")]
pub trait PaymasterApi {
    /// Ask the paymaster to sponsor a [UserOperation](UserOperation).
    ///
    /// # Arguments
    /// * `user_operation: UserOperation` - The unsigned [UserOperation](UserOperation) (dummy signature).
    /// * `entry_point: Address` - The address of the entry point.
    ///
    /// # Returns
    /// * `RpcResult<UserOperationSponsorship>` - Paymaster data and (optionally) gas limits.
    #[method(name = "sponsorUserOperation")]
    async fn sponsor_user_operation(
        &self,
        user_operation: UserOperation,
        entry_point: Address,
    ) -> RpcResult<UserOperationSponsorship>;
}
