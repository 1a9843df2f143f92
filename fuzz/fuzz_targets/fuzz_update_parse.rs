#![no_main]

use antibot_platform::telegram::wire::{into_event, ApiResponse, Update};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // A getUpdates response body from the network: parsing and event
    // extraction must never panic.
    if let Ok(response) = serde_json::from_slice::<ApiResponse<Vec<Update>>>(data) {
        for update in response.result.unwrap_or_default() {
            let _ = into_event(update);
        }
    }

    // Single updates, as they appear inside the envelope.
    if let Ok(update) = serde_json::from_slice::<Update>(data) {
        let _ = into_event(update);
    }
});
