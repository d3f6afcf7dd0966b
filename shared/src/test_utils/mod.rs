pub mod dynamo_test_utils;
pub mod http_test_utils;
pub mod mock_guest_store;
pub mod mock_notification_store;
pub mod test_logging;
