//! Contract bindings the faucet calls into.

use alloy::sol;

sol! {
    /// The subset of EIP20 the faucet needs.
    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}
