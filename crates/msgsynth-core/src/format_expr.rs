//! Builds the expression that yields a method's message string.

use crate::builder::BodyBuilder;
use crate::ir::Expr;
use crate::message_id::MessageIdFormatter;
use crate::model::{MethodDescriptor, TypeRef};

pub struct FormatExpressionBuilder<'a> {
    id_formatter: &'a dyn MessageIdFormatter,
    project_code: &'a str,
}

impl<'a> FormatExpressionBuilder<'a> {
    pub fn new(id_formatter: &'a dyn MessageIdFormatter, project_code: &'a str) -> Self {
        FormatExpressionBuilder {
            id_formatter,
            project_code,
        }
    }

    /// Invocation of the raw message-text accessor, e.g. `greet$str()`.
    pub fn accessor_call<B: BodyBuilder>(&self, b: &mut B, accessor: &str) -> Expr {
        b.invoke_instance(Expr::This, accessor, Vec::new())
    }

    /// Message text with the id prefix when the method carries an id. Never formats.
    pub fn message_text<B: BodyBuilder>(
        &self,
        b: &mut B,
        method: &MethodDescriptor,
        accessor: &str,
    ) -> Expr {
        let text = self.accessor_call(b, accessor);
        match method.message.id {
            Some(id) => Expr::Concat(vec![
                Expr::Str(self.id_formatter.format_id(self.project_code, id)),
                text,
            ]),
            None => text,
        }
    }

    /// The formatted message expression.
    ///
    /// Methods without parameters get the raw accessor value; everything else invokes the
    /// format function with the (prefixed) text followed by each format argument in
    /// declaration order.
    pub fn build<B: BodyBuilder>(
        &self,
        b: &mut B,
        method: &MethodDescriptor,
        accessor: &str,
    ) -> Expr {
        if method.params.is_empty() {
            return self.accessor_call(b, accessor);
        }

        let mut args = vec![self.message_text(b, method, accessor)];
        for param in method.format_args() {
            let arg = Expr::local(&param.name);
            let arg = match &param.formatter {
                Some(adapter) => b.construct(adapter, vec![arg]),
                None => arg,
            };
            args.push(arg);
        }

        let function = method.message.format.function();
        b.invoke_static(&TypeRef::new(function.owner), function.method, args)
    }
}
