// Message traits consumed by the msgsynth front-end tests.

#[exception(
    name = "com.acme.CustomException",
    constructors(string, string_throwable),
    construct(detail = message, cause)
)]
pub struct CustomException;

#[exception(name = "com.acme.StatusException", constructors(string))]
pub struct StatusException;

#[message_bundle(project_code = "EX", package = "com.acme.base")]
pub trait BaseMessages {
    #[message(id = 100, text = "base failure")]
    fn base_failure(&self) -> IllegalStateException;
}

#[message_bundle(project_code = "EX", package = "com.acme")]
pub trait Messages: BaseMessages {
    #[message(text = "Hello {0}")]
    fn greet(&self, name: &str) -> String;

    #[message(id = 7, text = "bad field {0}")]
    fn bad_field(&self, field: String) -> IllegalArgumentException;

    #[message(text = "wrapped")]
    fn wrap(&self, #[cause] cause: Throwable) -> RuntimeException;

    #[message(text = "build failed: {0}")]
    fn build(&self, detail: String, #[cause] cause: Throwable) -> CustomException;

    #[message(id = inherit, text = "base failure, again")]
    fn base_failure(&self) -> IllegalStateException;

    #[message(id = 9, text = "status %s at %d", format = "printf")]
    #[throws(java::io::IOException)]
    fn status(
        &self,
        state: String,
        #[format_with(com::acme::Hex)] offset: i64,
        #[field(name = "code")] c: i32,
        #[property] retry: bool,
    ) -> StatusException;
}
