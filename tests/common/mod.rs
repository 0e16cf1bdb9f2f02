use std::error::Error;

use ldap3::LdapConnAsync;

/// Root of the directory tree served by the docker environment.
pub const ROOT_DN: &str = "dc=example,dc=org";

fn user_dn(cn: &str) -> String {
	format!("cn={cn},ou=users,{ROOT_DN}")
}

pub async fn ldap_connect() -> Result<ldap3::Ldap, Box<dyn Error>> {
	let (conn, mut ldap) = LdapConnAsync::new("ldap://localhost:1389").await?;
	let _handle = tokio::spawn(async move {
		if let Err(err) = conn.drive().await {
			panic!("Ldap connection error {err}");
		}
	});
	ldap.simple_bind(&format!("cn=admin,{ROOT_DN}"), "adminpassword").await?;
	Ok(ldap)
}

pub async fn ldap_add_organizational_unit(
	ldap: &mut ldap3::Ldap,
	ou: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.add(&format!("ou={ou},{ROOT_DN}"), vec![("objectClass", ["organizationalUnit"].into())])
		.await?
		.success()?;
	Ok(())
}

pub async fn ldap_delete_organizational_unit(
	ldap: &mut ldap3::Ldap,
	ou: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.delete(&format!("ou={ou},{ROOT_DN}")).await?.success()?;
	Ok(())
}

/// Add an `inetOrgPerson` entry, optionally with a mail attribute. The
/// mail value may pack several comma-separated addresses into one value.
pub async fn ldap_add_user(
	ldap: &mut ldap3::Ldap,
	cn: &str,
	sn: &str,
	mail: Option<&str>,
) -> Result<(), Box<dyn Error>> {
	let mut attributes =
		vec![("objectClass", ["inetOrgPerson"].into()), ("sn", [sn].into())];
	if let Some(mail) = mail {
		attributes.push(("mail", [mail].into()));
	}
	ldap.add(&user_dn(cn), attributes).await?.success()?;
	Ok(())
}

pub async fn ldap_delete_user(ldap: &mut ldap3::Ldap, cn: &str) -> Result<(), Box<dyn Error>> {
	ldap.delete(&user_dn(cn)).await?.success()?;
	Ok(())
}

pub async fn ldap_user_add_attribute(
	ldap: &mut ldap3::Ldap,
	cn: &str,
	attribute: &str,
	value: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.modify(&user_dn(cn), vec![ldap3::Mod::Add(attribute, [value].into())])
		.await?
		.success()?;
	Ok(())
}
