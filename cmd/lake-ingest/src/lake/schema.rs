//! DDL for the 19 dataset tables and the 5 meta tables. Column order here
//! is load-bearing: the sink appends positionally.

pub const TABLE_DDL: [(&str, &str); 19] = [
    (
        "ledgers_row_v2",
        "CREATE TABLE IF NOT EXISTS ledgers_row_v2 (
            sequence UINTEGER NOT NULL,
            ledger_hash VARCHAR NOT NULL,
            previous_ledger_hash VARCHAR NOT NULL,
            closed_at BIGINT NOT NULL,
            protocol_version UINTEGER NOT NULL,
            total_coins BIGINT NOT NULL,
            fee_pool BIGINT NOT NULL,
            base_fee UINTEGER NOT NULL,
            base_reserve UINTEGER NOT NULL,
            max_tx_set_size UINTEGER NOT NULL,
            successful_transaction_count UINTEGER NOT NULL,
            failed_transaction_count UINTEGER NOT NULL,
            operation_count UINTEGER NOT NULL,
            tx_set_operation_count UINTEGER NOT NULL,
            soroban_fee_write_1kb BIGINT,
            total_byte_size_of_live_soroban_state UBIGINT,
            node_id VARCHAR,
            signature VARCHAR,
            ledger_header_xdr VARCHAR,
            ledger_range UINTEGER NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "transactions_row_v2",
        "CREATE TABLE IF NOT EXISTS transactions_row_v2 (
            transaction_hash VARCHAR NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            application_order UINTEGER NOT NULL,
            source_account VARCHAR NOT NULL,
            account_sequence BIGINT NOT NULL,
            max_fee BIGINT NOT NULL,
            fee_charged BIGINT NOT NULL,
            operation_count UINTEGER NOT NULL,
            successful BOOLEAN NOT NULL,
            result_code VARCHAR NOT NULL,
            memo_type VARCHAR NOT NULL,
            memo VARCHAR,
            fee_account VARCHAR,
            inner_transaction_hash VARCHAR,
            new_max_fee BIGINT,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "operations_row_v2",
        "CREATE TABLE IF NOT EXISTS operations_row_v2 (
            operation_id BIGINT NOT NULL,
            transaction_hash VARCHAR NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            application_order UINTEGER NOT NULL,
            operation_index UINTEGER NOT NULL,
            operation_type VARCHAR NOT NULL,
            source_account VARCHAR NOT NULL,
            successful BOOLEAN NOT NULL,
            operation_result_code VARCHAR NOT NULL,
            operation_trace_code VARCHAR NOT NULL,
            details VARCHAR NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "native_balances_snapshot_v1",
        "CREATE TABLE IF NOT EXISTS native_balances_snapshot_v1 (
            account_id VARCHAR NOT NULL,
            balance BIGINT NOT NULL,
            buying_liabilities BIGINT NOT NULL,
            selling_liabilities BIGINT NOT NULL,
            sequence_number BIGINT NOT NULL,
            num_sub_entries UINTEGER NOT NULL,
            last_modified_ledger UINTEGER NOT NULL,
            deleted BOOLEAN NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "effects_row_v1",
        "CREATE TABLE IF NOT EXISTS effects_row_v1 (
            effect_id VARCHAR NOT NULL,
            operation_id BIGINT NOT NULL,
            transaction_hash VARCHAR NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            effect_index UINTEGER NOT NULL,
            effect_type VARCHAR NOT NULL,
            account VARCHAR,
            amount VARCHAR,
            asset_type VARCHAR,
            asset_code VARCHAR,
            asset_issuer VARCHAR,
            details VARCHAR NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "trades_row_v1",
        "CREATE TABLE IF NOT EXISTS trades_row_v1 (
            trade_id VARCHAR NOT NULL,
            operation_id BIGINT NOT NULL,
            transaction_hash VARCHAR NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            trade_index UINTEGER NOT NULL,
            trade_type VARCHAR NOT NULL,
            seller VARCHAR,
            buyer VARCHAR NOT NULL,
            sold_asset_type VARCHAR NOT NULL,
            sold_asset_code VARCHAR,
            sold_asset_issuer VARCHAR,
            sold_amount BIGINT NOT NULL,
            bought_asset_type VARCHAR NOT NULL,
            bought_asset_code VARCHAR,
            bought_asset_issuer VARCHAR,
            bought_amount BIGINT NOT NULL,
            offer_id BIGINT,
            liquidity_pool_id VARCHAR,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "accounts_snapshot_v1",
        "CREATE TABLE IF NOT EXISTS accounts_snapshot_v1 (
            account_id VARCHAR NOT NULL,
            balance BIGINT NOT NULL,
            sequence_number BIGINT NOT NULL,
            sequence_ledger UINTEGER,
            sequence_time BIGINT,
            num_sub_entries UINTEGER NOT NULL,
            inflation_destination VARCHAR,
            flags UINTEGER NOT NULL,
            home_domain VARCHAR NOT NULL,
            master_weight UINTEGER NOT NULL,
            threshold_low UINTEGER NOT NULL,
            threshold_medium UINTEGER NOT NULL,
            threshold_high UINTEGER NOT NULL,
            buying_liabilities BIGINT NOT NULL,
            selling_liabilities BIGINT NOT NULL,
            num_sponsored UINTEGER,
            num_sponsoring UINTEGER,
            num_signers UINTEGER NOT NULL,
            deleted BOOLEAN NOT NULL,
            last_modified_ledger UINTEGER NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "trustlines_snapshot_v1",
        "CREATE TABLE IF NOT EXISTS trustlines_snapshot_v1 (
            account_id VARCHAR NOT NULL,
            asset_type VARCHAR NOT NULL,
            asset_code VARCHAR,
            asset_issuer VARCHAR,
            liquidity_pool_id VARCHAR,
            balance BIGINT NOT NULL,
            trust_limit BIGINT NOT NULL,
            buying_liabilities BIGINT NOT NULL,
            selling_liabilities BIGINT NOT NULL,
            flags UINTEGER NOT NULL,
            deleted BOOLEAN NOT NULL,
            last_modified_ledger UINTEGER NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "offers_snapshot_v1",
        "CREATE TABLE IF NOT EXISTS offers_snapshot_v1 (
            seller_id VARCHAR NOT NULL,
            offer_id BIGINT NOT NULL,
            selling_asset_type VARCHAR NOT NULL,
            selling_asset_code VARCHAR,
            selling_asset_issuer VARCHAR,
            buying_asset_type VARCHAR NOT NULL,
            buying_asset_code VARCHAR,
            buying_asset_issuer VARCHAR,
            amount BIGINT NOT NULL,
            price_n INTEGER NOT NULL,
            price_d INTEGER NOT NULL,
            flags UINTEGER NOT NULL,
            deleted BOOLEAN NOT NULL,
            last_modified_ledger UINTEGER NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "claimable_balances_snapshot_v1",
        "CREATE TABLE IF NOT EXISTS claimable_balances_snapshot_v1 (
            balance_id VARCHAR NOT NULL,
            asset_type VARCHAR NOT NULL,
            asset_code VARCHAR,
            asset_issuer VARCHAR,
            amount BIGINT NOT NULL,
            claimants VARCHAR NOT NULL,
            flags UINTEGER NOT NULL,
            deleted BOOLEAN NOT NULL,
            last_modified_ledger UINTEGER NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "liquidity_pools_snapshot_v1",
        "CREATE TABLE IF NOT EXISTS liquidity_pools_snapshot_v1 (
            liquidity_pool_id VARCHAR NOT NULL,
            pool_type VARCHAR NOT NULL,
            fee INTEGER NOT NULL,
            trustline_count BIGINT NOT NULL,
            total_pool_shares BIGINT NOT NULL,
            asset_a_type VARCHAR NOT NULL,
            asset_a_code VARCHAR,
            asset_a_issuer VARCHAR,
            reserve_a BIGINT NOT NULL,
            asset_b_type VARCHAR NOT NULL,
            asset_b_code VARCHAR,
            asset_b_issuer VARCHAR,
            reserve_b BIGINT NOT NULL,
            deleted BOOLEAN NOT NULL,
            last_modified_ledger UINTEGER NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "contract_events_stream_v1",
        "CREATE TABLE IF NOT EXISTS contract_events_stream_v1 (
            event_id VARCHAR NOT NULL,
            transaction_hash VARCHAR NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            operation_index UINTEGER NOT NULL,
            event_index UINTEGER NOT NULL,
            contract_id VARCHAR,
            event_type VARCHAR NOT NULL,
            topics VARCHAR NOT NULL,
            data_xdr VARCHAR NOT NULL,
            in_successful_contract_call BOOLEAN NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "contract_data_snapshot_v1",
        "CREATE TABLE IF NOT EXISTS contract_data_snapshot_v1 (
            contract_id VARCHAR NOT NULL,
            key_hash VARCHAR NOT NULL,
            durability VARCHAR NOT NULL,
            key_xdr VARCHAR NOT NULL,
            val_xdr VARCHAR NOT NULL,
            deleted BOOLEAN NOT NULL,
            last_modified_ledger UINTEGER NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "contract_code_snapshot_v1",
        "CREATE TABLE IF NOT EXISTS contract_code_snapshot_v1 (
            contract_code_hash VARCHAR NOT NULL,
            code_size UINTEGER NOT NULL,
            deleted BOOLEAN NOT NULL,
            last_modified_ledger UINTEGER NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "config_settings_snapshot_v1",
        "CREATE TABLE IF NOT EXISTS config_settings_snapshot_v1 (
            config_setting_id INTEGER NOT NULL,
            setting_xdr VARCHAR NOT NULL,
            deleted BOOLEAN NOT NULL,
            last_modified_ledger UINTEGER NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "ttl_snapshot_v1",
        "CREATE TABLE IF NOT EXISTS ttl_snapshot_v1 (
            key_hash VARCHAR NOT NULL,
            live_until_ledger_seq UINTEGER NOT NULL,
            deleted BOOLEAN NOT NULL,
            last_modified_ledger UINTEGER NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "evicted_keys_state_v1",
        "CREATE TABLE IF NOT EXISTS evicted_keys_state_v1 (
            key_hash VARCHAR NOT NULL,
            key_type VARCHAR NOT NULL,
            contract_id VARCHAR,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "restored_keys_state_v1",
        "CREATE TABLE IF NOT EXISTS restored_keys_state_v1 (
            key_hash VARCHAR NOT NULL,
            key_type VARCHAR NOT NULL,
            contract_id VARCHAR,
            transaction_hash VARCHAR NOT NULL,
            restored_from_ledger UINTEGER,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "account_signers_snapshot_v1",
        "CREATE TABLE IF NOT EXISTS account_signers_snapshot_v1 (
            account_id VARCHAR NOT NULL,
            signer VARCHAR NOT NULL,
            weight UINTEGER NOT NULL,
            sponsor VARCHAR,
            deleted BOOLEAN NOT NULL,
            last_modified_ledger UINTEGER NOT NULL,
            ledger_sequence UINTEGER NOT NULL,
            ledger_range UINTEGER NOT NULL,
            closed_at BIGINT NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
];

pub const META_DDL: [(&str, &str); 5] = [
    (
        "_meta_datasets",
        "CREATE TABLE IF NOT EXISTS _meta_datasets (
            name VARCHAR PRIMARY KEY,
            table_name VARCHAR NOT NULL,
            description VARCHAR NOT NULL,
            schema_version INTEGER NOT NULL,
            registered_at BIGINT NOT NULL
        )",
    ),
    (
        "_meta_lineage",
        "CREATE TABLE IF NOT EXISTS _meta_lineage (
            id VARCHAR PRIMARY KEY,
            dataset VARCHAR NOT NULL,
            source_ledger_start UINTEGER NOT NULL,
            source_ledger_end UINTEGER NOT NULL,
            pipeline_version VARCHAR NOT NULL,
            processor_name VARCHAR NOT NULL,
            row_count UBIGINT NOT NULL,
            created_at BIGINT NOT NULL,
            era_id VARCHAR NOT NULL,
            version_label VARCHAR NOT NULL,
            pas_event_id BIGINT,
            pas_event_hash VARCHAR,
            pas_verified BOOLEAN
        )",
    ),
    (
        "_meta_quality",
        "CREATE TABLE IF NOT EXISTS _meta_quality (
            id VARCHAR NOT NULL,
            check_name VARCHAR NOT NULL,
            check_type VARCHAR NOT NULL,
            dataset VARCHAR NOT NULL,
            passed BOOLEAN NOT NULL,
            failure_count UBIGINT NOT NULL,
            details VARCHAR,
            ledger_start UINTEGER NOT NULL,
            ledger_end UINTEGER NOT NULL,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "_meta_changes",
        "CREATE TABLE IF NOT EXISTS _meta_changes (
            id VARCHAR NOT NULL,
            change VARCHAR NOT NULL,
            details VARCHAR,
            created_at BIGINT NOT NULL
        )",
    ),
    (
        "_meta_eras",
        "CREATE TABLE IF NOT EXISTS _meta_eras (
            era_id VARCHAR NOT NULL,
            network VARCHAR NOT NULL,
            version_label VARCHAR NOT NULL,
            ledger_start UINTEGER NOT NULL,
            ledger_end UINTEGER,
            protocol_min UINTEGER,
            protocol_max UINTEGER,
            status VARCHAR NOT NULL,
            pas_chain_head VARCHAR,
            created_at BIGINT NOT NULL,
            frozen_at BIGINT,
            PRIMARY KEY (era_id, network)
        )",
    ),
];
