// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Kernel v3 account and factory ABI.

use alloy::sol;

sol! {
    interface IKernel {
        function initialize(
            bytes21 _rootValidator,
            address hook,
            bytes validatorData,
            bytes hookData,
            bytes[] initConfig
        ) external;

        function execute(bytes32 execMode, bytes executionCalldata) external payable;
    }

    interface IKernelFactory {
        function createAccount(bytes data, bytes32 salt) external payable returns (address);
    }

    /// ERC-7579 batch execution entry.
    struct Execution {
        address target;
        uint256 value;
        bytes callData;
    }
}
