//! HTTP client models: `java` (URLConnection), `apache` (HttpClient 4) and
//! `okhttp` (OkHttp 3).
//!
//! Shared role paths: `URL`, `Client`, `Request`, `Connection` (the
//! response), `Body`, `InputStream`, `ContentLength`. The request state
//! `hasURL` means "target address known".

use crate::builder::{LibraryBuilder, TransitionDraft};
use crate::error::ModelError;
use crate::model::{ActionId, Library, RoleId, StateId};
use crate::props::Guard;
use std::collections::BTreeMap;

struct Common {
    url: RoleId,
    request: RoleId,
    connection: RoleId,
    body: RoleId,
    input_stream: RoleId,
    content_length: RoleId,
    has_url: StateId,
    set_header: ActionId,
}

fn common(b: &mut LibraryBuilder, request_type: &str, connection_type: &str) -> Result<Common, ModelError> {
    let url = b.typed_role("URL", "String")?;
    let request = b.typed_role("Request", request_type)?;
    let connection = b.typed_role("Connection", connection_type)?;
    let body = b.typed_role("Body", "String")?;
    let input_stream = b.typed_role("InputStream", "java.io.InputStream")?;
    let content_length = b.typed_role("ContentLength", "long")?;
    let has_url = b.state(request, "hasURL");
    let set_header = b.action("SetHeader", Some("headers"), true);
    Ok(Common {
        url,
        request,
        connection,
        body,
        input_stream,
        content_length,
        has_url,
        set_header,
    })
}

fn slots(role: &str, state: StateId) -> BTreeMap<String, StateId> {
    BTreeMap::from([(role.to_string(), state)])
}

pub fn java() -> Result<Library, ModelError> {
    let mut b = LibraryBuilder::new("java");
    let c = common(&mut b, "java.net.URL", "java.net.URLConnection")?;

    b.add(
        TransitionDraft::construct(b.init(c.request), c.has_url, c.request)
            .entity("spec", b.constructed(c.url)),
    )?;
    let open = b.add(
        TransitionDraft::call(c.has_url, c.has_url, "openConnection").significant(),
    )?;
    b.link(open, b.constructed(c.connection))?;

    let conn = b.constructed(c.connection);
    b.add(
        TransitionDraft::call(conn, conn, "setRequestProperty")
            .with_action(c.set_header)
            .action_arg(c.set_header, "headerName")
            .action_arg(c.set_header, "headerValue"),
    )?;
    let stream = b.add(TransitionDraft::call(conn, conn, "getInputStream").significant())?;
    b.link(stream, b.constructed(c.input_stream))?;
    let length = b.add(TransitionDraft::call(conn, conn, "getContentLengthLong").significant())?;
    b.link(length, b.constructed(c.content_length))?;
    let read = b.add(TransitionDraft::template(
        conn,
        conn,
        "new String(<Connection>.getInputStream().readAllBytes())",
        slots("Connection", conn),
    ))?;
    b.link(read, b.constructed(c.body))?;
    b.build()
}

pub fn apache() -> Result<Library, ModelError> {
    let mut b = LibraryBuilder::new("apache");
    let c = common(
        &mut b,
        "org.apache.http.client.methods.HttpGet",
        "org.apache.http.client.methods.CloseableHttpResponse",
    )?;
    let client = b.typed_role("Client", "org.apache.http.impl.client.CloseableHttpClient")?;
    let clients = b.typed_role("HttpClients", "org.apache.http.impl.client.HttpClients")?;
    let entity_utils = b.typed_role("EntityUtils", "org.apache.http.util.EntityUtils")?;

    let create = b.add(
        TransitionDraft::call(b.init(clients), b.constructed(clients), "createDefault")
            .static_call()
            .significant(),
    )?;
    b.link(create, b.constructed(client))?;

    b.add(
        TransitionDraft::construct(b.init(c.request), c.has_url, c.request)
            .entity("uri", b.constructed(c.url)),
    )?;
    b.add(
        TransitionDraft::construct(b.init(c.request), b.constructed(c.request), c.request),
    )?;
    b.add(
        TransitionDraft::call(b.constructed(c.request), c.has_url, "setURI")
            .entity("uri", b.constructed(c.url)),
    )?;
    b.add(
        TransitionDraft::call(c.has_url, c.has_url, "setHeader")
            .with_action(c.set_header)
            .action_arg(c.set_header, "headerName")
            .action_arg(c.set_header, "headerValue"),
    )?;

    let client_ready = b.constructed(client);
    let execute = b.add(
        TransitionDraft::call(client_ready, client_ready, "execute")
            .entity("request", c.has_url)
            .significant(),
    )?;
    b.link(execute, b.constructed(c.connection))?;

    let conn = b.constructed(c.connection);
    let content = b.add(TransitionDraft::template(
        conn,
        conn,
        "<Connection>.getEntity().getContent()",
        slots("Connection", conn),
    ))?;
    b.link(content, b.constructed(c.input_stream))?;
    let length = b.add(TransitionDraft::template(
        conn,
        conn,
        "<Connection>.getEntity().getContentLength()",
        slots("Connection", conn),
    ))?;
    b.link(length, b.constructed(c.content_length))?;
    let to_string = b.add(TransitionDraft::template(
        b.init(entity_utils),
        b.init(entity_utils),
        "EntityUtils.toString(<Connection>.getEntity())",
        slots("Connection", conn),
    ))?;
    b.link(to_string, b.constructed(c.body))?;
    b.build()
}

pub fn okhttp() -> Result<Library, ModelError> {
    let mut b = LibraryBuilder::new("okhttp");
    let c = common(&mut b, "okhttp3.Request.Builder", "okhttp3.Response")?;
    let client = b.typed_role("Client", "okhttp3.OkHttpClient")?;
    let call = b.typed_role("Call", "okhttp3.Call")?;
    let response_body = b.typed_role("ResponseBody", "okhttp3.ResponseBody")?;
    let built = b.state(c.request, "Built");
    b.type_rule(c.request, Guard::equals("built", true), "okhttp3.Request");

    b.add(TransitionDraft::construct(
        b.init(client),
        b.constructed(client),
        client,
    ))?;

    b.add(TransitionDraft::construct(
        b.init(c.request),
        b.constructed(c.request),
        c.request,
    ))?;
    b.add(
        TransitionDraft::call(b.constructed(c.request), c.has_url, "url")
            .entity("url", b.constructed(c.url))
            .significant(),
    )?;
    b.add(
        TransitionDraft::call(c.has_url, c.has_url, "addHeader")
            .with_action(c.set_header)
            .action_arg(c.set_header, "headerName")
            .action_arg(c.set_header, "headerValue")
            .significant(),
    )?;
    b.add(
        TransitionDraft::call(c.has_url, built, "build")
            .guard(Guard::not(Guard::Has("built".into())))
            .set("built", true)
            .significant(),
    )?;

    let client_ready = b.constructed(client);
    let new_call = b.add(
        TransitionDraft::call(client_ready, client_ready, "newCall")
            .entity("request", built)
            .significant(),
    )?;
    b.link(new_call, b.constructed(call))?;

    let call_ready = b.constructed(call);
    let execute = b.add(TransitionDraft::call(call_ready, call_ready, "execute").significant())?;
    b.link(execute, b.constructed(c.connection))?;

    let conn = b.constructed(c.connection);
    let body = b.add(TransitionDraft::call(conn, conn, "body").significant())?;
    b.link(body, b.constructed(response_body))?;

    let rb = b.constructed(response_body);
    for (method, target) in [
        ("string", c.body),
        ("byteStream", c.input_stream),
        ("contentLength", c.content_length),
    ] {
        let t = b.add(TransitionDraft::call(rb, rb, method).significant())?;
        b.link(t, b.constructed(target))?;
    }
    b.build()
}
