//! Operator-facing text for Policy Store error codes.

/// Text for a store error code. Unknown codes are echoed back.
pub fn error_message(code: &str) -> String {
    let known = match code {
        // auth
        "INVALID_TOKEN" => "Your authentication token is invalid. Please log in again.",
        "TOKEN_EXPIRED" => "Your session token has expired. Please log in again.",
        "INVALID_MASTER_PASSWORD" => "Invalid master password. Please try again.",
        "MASTER_PASSWORD_LOCKED" => {
            "Master password is locked due to too many failed attempts. Please wait."
        }
        "SYSTEM_LOCKED" => "The system is currently locked.",

        // policy
        "POLICY_NOT_FOUND" => "Policy not found.",
        "POLICY_DENIED" => "Transaction denied by policy.",
        "SPENDING_LIMIT_EXCEEDED" => "Spending limit has been exceeded.",
        "RATE_LIMIT_EXCEEDED" => "Rate limit exceeded. Please wait before retrying.",
        "WHITELIST_DENIED" => "The destination address is not in the whitelist.",
        "ACTION_VALIDATION_FAILED" => "Action input validation failed.",
        "INVALID_ADDRESS" => "The blockchain address is invalid.",

        // wallet
        "WALLET_NOT_FOUND" => "Wallet not found.",
        "WALLET_SUSPENDED" => "This wallet is currently suspended.",
        "WALLET_TERMINATED" => "This wallet has been terminated.",

        // system
        "KILL_SWITCH_ACTIVE" => "Kill switch is active. All operations are suspended.",
        "KEYSTORE_LOCKED" => "The keystore is locked. Please try again.",
        "CHAIN_NOT_SUPPORTED" => "This blockchain is not supported.",
        "SHUTTING_DOWN" => "The daemon is shutting down.",

        // client side
        "NETWORK_ERROR" => "Cannot connect to the daemon. Check if it is running.",
        "TIMEOUT" => "Request timed out. The daemon may be busy.",

        _ => return format!("An error occurred ({code})."),
    };
    known.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(error_message("POLICY_NOT_FOUND"), "Policy not found.");
        assert_eq!(
            error_message("NETWORK_ERROR"),
            "Cannot connect to the daemon. Check if it is running."
        );
    }

    #[test]
    fn test_unknown_code_falls_back() {
        assert_eq!(
            error_message("SOMETHING_NEW"),
            "An error occurred (SOMETHING_NEW)."
        );
    }
}
