//! Contract ABIs - ERC-20 and Uniswap-V2 Router
//!
//! SunSwap V2 is a Uniswap V2 fork, so the router ABI below covers it
//! and any other V2-compatible router. Calls are encoded with
//! `alloy::sol_types` and sent as raw `eth_call` / transactions by the
//! gateway.

use alloy::primitives::Bytes;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::ports::ledger::ContractCall;

sol! {
    interface IERC20 {
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
    }

    interface IUniswapV2Router02 {
        function getAmountsOut(uint256 amountIn, address[] calldata path)
            external view returns (uint256[] memory amounts);

        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);
    }
}

/// Target contract and calldata for a `ContractCall`.
pub fn encode_call(call: &ContractCall) -> (alloy::primitives::Address, Bytes) {
    match call {
        ContractCall::Approve {
            token,
            spender,
            amount,
        } => {
            let data = IERC20::approveCall {
                spender: *spender,
                value: *amount,
            }
            .abi_encode();
            (*token, data.into())
        }
        ContractCall::SwapExactTokensForTokens {
            router,
            amount_in,
            amount_out_min,
            path,
            to,
            deadline,
        } => {
            let data = IUniswapV2Router02::swapExactTokensForTokensCall {
                amountIn: *amount_in,
                amountOutMin: *amount_out_min,
                path: path.clone(),
                to: *to,
                deadline: *deadline,
            }
            .abi_encode();
            (*router, data.into())
        }
    }
}
