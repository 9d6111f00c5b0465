use darling::ast::Data;
use darling::{FromDeriveInput, FromField};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Generics, Ident};

#[derive(FromDeriveInput, Debug)]
#[darling(attributes(filter), supports(struct_named))]
pub struct FilterableInfo {
    ident: Ident,
    generics: Generics,
    data: Data<(), FilterableAttr>,
}

#[derive(FromField, Debug)]
#[darling(attributes(filter))]
struct FilterableAttr {
    ident: Option<Ident>,
    ty: syn::Type,
    #[darling(default)]
    rename: Option<String>,
    #[darling(default)]
    skip: bool,
}

struct FieldInfo {
    ident: Ident,
    name: String,
    ty: syn::Type,
}

impl FilterableInfo {
    fn field_infos(&self) -> Vec<FieldInfo> {
        match &self.data {
            Data::Struct(fields) => fields
                .iter()
                .filter(|f| !f.skip)
                .filter_map(|f| {
                    let ident = f.ident.clone()?;
                    let name = f.rename.clone().unwrap_or_else(|| ident.to_string());
                    Some(FieldInfo {
                        ident,
                        name,
                        ty: f.ty.clone(),
                    })
                })
                .collect(),
            Data::Enum(_) => Vec::new(),
        }
    }

    pub fn to_tokens(&self) -> TokenStream {
        let name = &self.ident;
        let string_name = name.to_string();
        let (impl_generics, ty_generics, where_clause) = self.generics.split_for_impl();
        let fields = self.field_infos();
        let declare = fields.iter().map(|f| {
            let ty = &f.ty;
            let field_name = &f.name;
            quote! {
                .field::<#ty>(#field_name)
            }
        });
        let access = fields.iter().map(|f| {
            let ident = &f.ident;
            let field_name = &f.name;
            quote! {
                #field_name => Some(dynfilter::FilterField::field_ref(&self.#ident)),
            }
        });
        quote! {
            impl #impl_generics dynfilter::Filterable for #name #ty_generics #where_clause {
                fn description() -> dynfilter::RecordDescription {
                    dynfilter::RecordDescription::builder(#string_name)
                        #(#declare)*
                        .build()
                }

                fn field(&self, name: &str) -> Option<dynfilter::FieldRef<'_>> {
                    match name {
                        #(#access)*
                        _ => None,
                    }
                }
            }

            impl #impl_generics dynfilter::FilterField for #name #ty_generics #where_clause {
                fn field_type() -> dynfilter::FieldType {
                    dynfilter::FieldType::Record {
                        nullable: false,
                        description: <Self as dynfilter::Filterable>::description,
                    }
                }

                fn field_ref(&self) -> dynfilter::FieldRef<'_> {
                    dynfilter::FieldRef::Record(self)
                }
            }
        }
    }
}
