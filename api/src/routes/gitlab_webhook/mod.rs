pub mod gitlab_webhook_response;
pub mod gitlab_webhook_route;
