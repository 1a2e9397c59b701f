//! Bindings and constants of the contracts this project deploys.

use alloy::{primitives::aliases::U96, sol};

/// Artifact name of the VRF coordinator mock.
pub const VRF_COORDINATOR_V2_MOCK: &str = "VRFCoordinatorV2Mock";
/// Artifact name of the Lottery.
pub const LOTTERY: &str = "Lottery";

/// Flat LINK fee charged by the mock per request: 0.25 LINK.
pub const BASE_FEE: U96 = U96::from_limbs([250_000_000_000_000_000, 0]);
/// LINK per gas charged by the mock: 1 gwei worth of LINK.
pub const GAS_PRICE_LINK: U96 = U96::from_limbs([1_000_000_000, 0]);
/// LINK funded into a fresh mock subscription: 2 LINK.
pub const VRF_SUB_FUND_AMOUNT: U96 = U96::from_limbs([2_000_000_000_000_000_000, 0]);

sol! {
    #[sol(rpc)]
    contract VRFCoordinatorV2Mock {
        event SubscriptionCreated(uint64 indexed subId, address owner);

        constructor(uint96 baseFee, uint96 gasPriceLink);

        function createSubscription() external returns (uint64 subId);
        function fundSubscription(uint64 subId, uint96 amount) external;
        function addConsumer(uint64 subId, address consumer) external;
    }
}

sol! {
    contract Lottery {
        constructor(
            address vrfCoordinatorV2,
            address admin,
            uint256 entranceFee,
            bytes32 gasLane,
            uint64 subscriptionId,
            uint32 callbackGasLimit
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{
        primitives::{Address, B256, U256},
        sol_types::{SolConstructor, SolValue},
    };

    #[test]
    fn test_mock_fee_constants() {
        let link = U96::from(10u64).pow(U96::from(18u64));
        assert_eq!(BASE_FEE * U96::from(4u64), link);
        assert_eq!(GAS_PRICE_LINK, U96::from(1_000_000_000u64));
        assert_eq!(VRF_SUB_FUND_AMOUNT, link * U96::from(2u64));
    }

    #[test]
    fn test_lottery_constructor_argument_order() {
        let coordinator = Address::repeat_byte(0x01);
        let admin = Address::repeat_byte(0x02);
        let gas_lane = B256::repeat_byte(0x03);

        let encoded = Lottery::constructorCall {
            vrfCoordinatorV2: coordinator,
            admin,
            entranceFee: U256::from(10u64),
            gasLane: gas_lane,
            subscriptionId: 7,
            callbackGasLimit: 500_000,
        }
        .abi_encode();

        let expected = (
            coordinator,
            admin,
            U256::from(10u64),
            gas_lane,
            7u64,
            500_000u32,
        )
            .abi_encode_params();
        assert_eq!(encoded, expected);
        assert_eq!(encoded.len(), 6 * 32);
    }
}
