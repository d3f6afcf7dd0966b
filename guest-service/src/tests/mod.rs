mod dynamo_tests;
mod notification_tests;
mod utils;
