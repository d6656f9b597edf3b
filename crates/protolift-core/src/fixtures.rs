//! Smali fixtures shaped like Wire generated code, shared by the unit tests.

use crate::smali::{ENCODE_WITH_TAG, ENUM_MARKER};
use std::fmt::Write;

/// `sget-object` operand for a built-in scalar adapter
pub(crate) fn scalar(keyword: &str) -> String {
    format!(
        "Lcom/squareup/wire/ProtoAdapter;->{}:Lcom/squareup/wire/ProtoAdapter;",
        keyword
    )
}

/// `sget-object` operand for the adapter of a generated class
pub(crate) fn adapter_of(class_path: &str) -> String {
    format!("L{};->ADAPTER:Lcom/squareup/wire/ProtoAdapter;", class_path)
}

fn hex(value: i64) -> String {
    if value < 0 {
        format!("-0x{:x}", value.unsigned_abs())
    } else {
        format!("0x{:x}", value)
    }
}

/// Instructions encoding one field, optionally wrapped by a cardinality call
pub(crate) fn field(
    adapter: &str,
    wrapper: Option<&str>,
    tag: u32,
    class_path: &str,
    name: &str,
) -> String {
    let mut out = String::new();
    writeln!(out, "    sget-object v0, {}", adapter).unwrap();
    writeln!(out).unwrap();
    if let Some(wrapper) = wrapper {
        writeln!(out, "    invoke-virtual {{v0}}, {}", wrapper).unwrap();
        writeln!(out).unwrap();
        writeln!(out, "    move-result-object v0").unwrap();
        writeln!(out).unwrap();
    }
    writeln!(out, "    const/16 v1, {}", hex(tag as i64)).unwrap();
    writeln!(out).unwrap();
    writeln!(
        out,
        "    iget-object v2, p2, L{};->{}:Ljava/lang/Object;",
        class_path, name
    )
    .unwrap();
    writeln!(out).unwrap();
    writeln!(out, "    invoke-virtual {{v0, p1, v1, v2}}, {}", ENCODE_WITH_TAG).unwrap();
    writeln!(out).unwrap();
    out
}

/// A complete message adapter class.
///
/// `body` is the content of the typed `encode` method and must bring its own
/// `return-void` when the method should terminate.
pub(crate) fn message_class(class_path: &str, body: &str) -> String {
    let name = class_path.rsplit('/').next().unwrap_or(class_path);
    format!(
        r#".class public final L{cp}$Companion$ADAPTER$1;
.super Lcom/squareup/wire/ProtoAdapter;
.source "{name}.kt"


# direct methods
.method constructor <init>(Lcom/squareup/wire/FieldEncoding;Lkotlin/reflect/KClass;)V
    .registers 3

    invoke-direct {{p0, p1, p2}}, Lcom/squareup/wire/ProtoAdapter;-><init>(Lcom/squareup/wire/FieldEncoding;Lkotlin/reflect/KClass;)V

    return-void
.end method


# virtual methods
.method public final encode(Lcom/squareup/wire/ProtoWriter;Ljava/lang/Object;)V
    .registers 3

    check-cast p2, L{cp};

    invoke-virtual {{p0, p1, p2}}, L{cp}$Companion$ADAPTER$1;->encode(Lcom/squareup/wire/ProtoWriter;L{cp};)V

    return-void
.end method

.method public encode(Lcom/squareup/wire/ProtoWriter;L{cp};)V
    .registers 6

{body}
.end method
"#,
        cp = class_path,
        name = name,
        body = body
    )
}

/// The `a/b/Foo` message with a single `int32 bar = 1` field
pub(crate) fn foo_message() -> String {
    let mut body = field(&scalar("INT32"), None, 1, "a/b/Foo", "bar");
    body.push_str("    return-void\n");
    message_class("a/b/Foo", &body)
}

/// A complete Wire enum class.
///
/// For every value, the name is loaded into `v1`, the ordinal into `v2` and
/// the value into `v3`; `args` is the register list of the constructor call.
pub(crate) fn enum_class(
    class_path: &str,
    signature: &str,
    args: &str,
    values: &[(&str, i64)],
) -> String {
    let name = class_path.rsplit('/').next().unwrap_or(class_path);
    let mut clinit = String::new();
    for (ordinal, (constant, value)) in values.iter().enumerate() {
        writeln!(clinit, "    new-instance v0, L{};", class_path).unwrap();
        writeln!(clinit).unwrap();
        writeln!(clinit, "    const-string v1, \"{}\"", constant).unwrap();
        writeln!(clinit).unwrap();
        writeln!(clinit, "    const/4 v2, {}", hex(ordinal as i64)).unwrap();
        writeln!(clinit).unwrap();
        writeln!(clinit, "    const/16 v3, {}", hex(*value)).unwrap();
        writeln!(clinit).unwrap();
        writeln!(
            clinit,
            "    invoke-direct {{{}}}, L{};-><init>({})V",
            args, class_path, signature
        )
        .unwrap();
        writeln!(clinit).unwrap();
        writeln!(
            clinit,
            "    sput-object v0, L{cp};->{c}:L{cp};",
            cp = class_path,
            c = constant
        )
        .unwrap();
        writeln!(clinit).unwrap();
    }

    format!(
        r#".class public final enum L{cp};
.super Ljava/lang/Enum;
.source "{name}.kt"

# interfaces
{marker}


# direct methods
.method static constructor <clinit>()V
    .registers 5

{clinit}    new-instance v0, L{cp}$Companion;

    const/4 v1, 0x0

    invoke-direct {{v0, v1}}, L{cp}$Companion;-><init>(Lkotlin/jvm/internal/DefaultConstructorMarker;)V

    return-void
.end method

.method private constructor <init>({signature})V
    .registers 5

    invoke-direct {{p0, p1, p2}}, Ljava/lang/Enum;-><init>(Ljava/lang/String;I)V

    return-void
.end method
"#,
        cp = class_path,
        name = name,
        marker = ENUM_MARKER,
        clinit = clinit,
        signature = signature
    )
}

/// The `a/b/Color` enum with `RED = 0` and `GREEN = 1`
pub(crate) fn color_enum() -> String {
    enum_class(
        "a/b/Color",
        "Ljava/lang/String;II",
        "v0, v1, v2, v3",
        &[("RED", 0), ("GREEN", 1)],
    )
}
