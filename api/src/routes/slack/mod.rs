pub mod slack_command_route;
pub mod slack_interactivity_route;
pub mod slack_request;
